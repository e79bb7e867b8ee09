// src/store/memory.rs

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::AppError;
use crate::models::attempt::{Attempt, StudentAnswer};
use crate::models::question::{AnswerOption, Question, QuestionKind, QuestionWithOptions};
use crate::models::quiz::Quiz;
use crate::store::{NewStudentAnswer, RecordStore};

/// In-process `RecordStore` fake. Grading behavior is deterministic against
/// it, which is what the grading test-suite runs on.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    quizzes: HashMap<i64, Quiz>,
    questions: HashMap<i64, Vec<QuestionWithOptions>>,
    attempts: HashMap<i64, Attempt>,
    answers: HashMap<i64, Vec<StudentAnswer>>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a quiz with default settings and returns its id.
    pub fn add_quiz(&self, title: &str) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        inner.quizzes.insert(
            id,
            Quiz {
                id,
                class_id: 1,
                title: title.to_string(),
                show_score: true,
                attempts_allowed: 0,
                time_limit_seconds: None,
                opens_at: None,
                closes_at: None,
                created_by: 1,
                created_at: Some(Utc::now()),
            },
        );
        inner.questions.insert(id, Vec::new());
        id
    }

    /// Seeds a question. `options` pairs are (label, is_correct); essays
    /// take an empty slice. Returns the question id.
    pub fn add_question(
        &self,
        quiz_id: i64,
        kind: QuestionKind,
        points: i64,
        options: &[(&str, bool)],
    ) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let position = inner
            .questions
            .get(&quiz_id)
            .map(|qs| qs.len() as i64 + 1)
            .unwrap_or(1);
        let options = options
            .iter()
            .enumerate()
            .map(|(i, (label, is_correct))| AnswerOption {
                id: id * 100 + i as i64 + 1,
                question_id: id,
                position: i as i64 + 1,
                label: label.to_string(),
                is_correct: *is_correct,
            })
            .collect();
        inner
            .questions
            .entry(quiz_id)
            .or_default()
            .push(QuestionWithOptions {
                question: Question {
                    id,
                    quiz_id,
                    position,
                    kind: kind.as_str().to_string(),
                    prompt: format!("Question {}", position),
                    points,
                },
                options,
            });
        id
    }

    /// Seeds an in-progress attempt and returns its id.
    pub fn add_attempt(&self, quiz_id: i64, student_id: i64) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let attempt_number = inner
            .attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.student_id == student_id)
            .count() as i64
            + 1;
        inner.attempts.insert(
            id,
            Attempt {
                id,
                quiz_id,
                student_id,
                attempt_number,
                started_at: Utc::now(),
                submitted_at: None,
                elapsed_seconds: None,
                score: None,
                total_points: None,
            },
        );
        id
    }

    /// Seeds an ungraded (autosaved) answer row, as the autosave path would.
    pub fn seed_answer(&self, attempt_id: i64, question_id: i64, response: &str) {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        inner.answers.entry(attempt_id).or_default().push(StudentAnswer {
            id,
            attempt_id,
            question_id,
            response_text: response.to_string(),
            selected_option_id: None,
            points_awarded: None,
            is_correct: None,
        });
    }

    /// Rewrites the label of an existing option, simulating an instructor
    /// editing option text after submissions exist.
    pub fn rename_option(&self, quiz_id: i64, option_id: i64, new_label: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(questions) = inner.questions.get_mut(&quiz_id) {
            for record in questions {
                for option in &mut record.options {
                    if option.id == option_id {
                        option.label = new_label.to_string();
                    }
                }
            }
        }
    }

    pub fn stored_answers(&self, attempt_id: i64) -> Vec<StudentAnswer> {
        let inner = self.inner.lock().unwrap();
        inner.answers.get(&attempt_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.attempts.get(&attempt_id).cloned())
    }

    async fn quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.quizzes.get(&quiz_id).cloned())
    }

    async fn questions_for_quiz(
        &self,
        quiz_id: i64,
    ) -> Result<Vec<QuestionWithOptions>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.questions.get(&quiz_id).cloned().unwrap_or_default())
    }

    async fn answers_for_attempt(
        &self,
        attempt_id: i64,
    ) -> Result<Vec<StudentAnswer>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.answers.get(&attempt_id).cloned().unwrap_or_default())
    }

    async fn commit_grades(
        &self,
        attempt_id: i64,
        answers: &[NewStudentAnswer],
        score: i64,
        total_points: i64,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.attempts.contains_key(&attempt_id) {
            return Err(AppError::NotFound("Attempt not found".to_string()));
        }

        let rows = answers
            .iter()
            .map(|a| {
                let id = inner.next_id();
                StudentAnswer {
                    id,
                    attempt_id,
                    question_id: a.question_id,
                    response_text: a.response_text.clone(),
                    selected_option_id: a.selected_option_id,
                    points_awarded: Some(a.points_awarded),
                    is_correct: Some(a.is_correct),
                }
            })
            .collect();
        inner.answers.insert(attempt_id, rows);

        let attempt = inner.attempts.get_mut(&attempt_id).unwrap();
        attempt.score = Some(score);
        attempt.total_points = Some(total_points);
        let now = Utc::now();
        if attempt.submitted_at.is_none() {
            attempt.submitted_at = Some(now);
            attempt.elapsed_seconds =
                Some((now - attempt.started_at).num_seconds().max(0));
        }

        Ok(())
    }
}
