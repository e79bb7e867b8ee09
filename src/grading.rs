// src/grading.rs
//
// The grading engine: turns a map of raw submitted answers into persisted,
// scored answer rows and an aggregate attempt score. Re-running it on the
// same attempt and answers is idempotent; prior rows are cleared and
// rewritten atomically by the store.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::AppError;
use crate::models::question::{AnswerOption, QuestionKind, QuestionWithOptions};
use crate::store::{NewStudentAnswer, RecordStore};

/// Aggregate result of grading one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeOutcome {
    /// Percentage of total possible points, rounded half-up.
    pub score: i64,
    /// Total possible points across all questions, answered or not.
    pub total_points: i64,
    /// Answer rows written for the attempt.
    pub answered_count: usize,
    /// Selectable answers that were auto-graded.
    pub graded_count: usize,
    /// Essay answers written, i.e. responses pending manual review.
    pub essay_count: usize,
}

/// How one question is scored. Essay answers are never auto-scored; making
/// that a variant keeps the grading match exhaustive.
enum QuestionBody<'a> {
    Selectable {
        options: &'a [AnswerOption],
        fold_case: bool,
    },
    FreeText,
}

fn body_of(record: &QuestionWithOptions) -> Result<QuestionBody<'_>, AppError> {
    let kind = QuestionKind::parse(&record.question.kind).ok_or_else(|| {
        AppError::Internal(format!(
            "Question {} has unknown kind '{}'",
            record.question.id, record.question.kind
        ))
    })?;

    Ok(match kind {
        QuestionKind::Single => QuestionBody::Selectable {
            options: &record.options,
            fold_case: false,
        },
        // Boolean options ("True"/"False") match case-insensitively.
        QuestionKind::Boolean => QuestionBody::Selectable {
            options: &record.options,
            fold_case: true,
        },
        QuestionKind::Essay => QuestionBody::FreeText,
    })
}

/// Finds the option whose display text matches the submitted value.
/// Submission stores raw display text, so grading re-resolves it against the
/// question's current options; no match means the question counts as
/// unanswered rather than failing.
fn resolve_selection<'a>(
    options: &'a [AnswerOption],
    raw: &str,
    fold_case: bool,
) -> Option<&'a AnswerOption> {
    options.iter().find(|o| {
        if fold_case {
            o.label.eq_ignore_ascii_case(raw)
        } else {
            o.label == raw
        }
    })
}

/// Percentage of `points` out of `total`, rounded half-up to the nearest
/// integer. A quiz with no questions scores 0.
pub fn round_percent(points: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((100.0 * points as f64 / total as f64) + 0.5).floor() as i64
}

/// Grades an attempt against a raw answer map (question id -> submitted
/// display text or essay text). Translates, persists and grades in one
/// call; this is the submit path.
pub async fn grade_submission(
    store: &dyn RecordStore,
    attempt_id: i64,
    raw_answers: &HashMap<i64, String>,
) -> Result<GradeOutcome, AppError> {
    let attempt = store
        .attempt(attempt_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;

    let quiz = store
        .quiz(attempt.quiz_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    let questions = store.questions_for_quiz(quiz.id).await?;

    let mut graded: Vec<NewStudentAnswer> = Vec::new();
    let mut earned: i64 = 0;
    let mut graded_count = 0;
    let mut essay_count = 0;

    // Total possible points is independent of how many questions were
    // answered.
    let total: i64 = questions.iter().map(|q| q.question.points).sum();

    for record in &questions {
        let raw = match raw_answers.get(&record.question.id) {
            Some(text) if !text.trim().is_empty() => text,
            // Absent or blank entries mean unanswered: no row, zero points.
            _ => continue,
        };

        match body_of(record)? {
            QuestionBody::Selectable { options, fold_case } => {
                let Some(option) = resolve_selection(options, raw, fold_case) else {
                    // Text no longer matches any option; counts as unanswered.
                    continue;
                };
                let is_correct = option.is_correct;
                let points = if is_correct { record.question.points } else { 0 };
                earned += points;
                graded_count += 1;
                graded.push(NewStudentAnswer {
                    question_id: record.question.id,
                    response_text: raw.clone(),
                    selected_option_id: Some(option.id),
                    points_awarded: points,
                    is_correct,
                });
            }
            QuestionBody::FreeText => {
                // Fixed policy: essays stay at zero until a human reviewer
                // supplies a score through the manual-grading path.
                essay_count += 1;
                graded.push(NewStudentAnswer {
                    question_id: record.question.id,
                    response_text: raw.clone(),
                    selected_option_id: None,
                    points_awarded: 0,
                    is_correct: false,
                });
            }
        }
    }

    let score = round_percent(earned, total);

    store
        .commit_grades(attempt_id, &graded, score, total)
        .await?;

    Ok(GradeOutcome {
        score,
        total_points: total,
        answered_count: graded.len(),
        graded_count,
        essay_count,
    })
}

/// Re-runs grading against the raw answer text already stored for the
/// attempt. Used by the bulk "calculate pending scores" action and for
/// instructor-triggered rescoring; deterministic and idempotent.
pub async fn recalculate(
    store: &dyn RecordStore,
    attempt_id: i64,
) -> Result<GradeOutcome, AppError> {
    let stored = store.answers_for_attempt(attempt_id).await?;

    let raw_answers: HashMap<i64, String> = stored
        .into_iter()
        .map(|a| (a.question_id, a.response_text))
        .collect();

    grade_submission(store, attempt_id, &raw_answers).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: i64, label: &str, is_correct: bool) -> AnswerOption {
        AnswerOption {
            id,
            question_id: 1,
            position: id,
            label: label.to_string(),
            is_correct,
        }
    }

    #[test]
    fn resolve_selection_exact_match() {
        let options = vec![option(1, "Paris", true), option(2, "Rome", false)];

        assert_eq!(resolve_selection(&options, "Rome", false).unwrap().id, 2);
        assert!(resolve_selection(&options, "rome", false).is_none());
        assert!(resolve_selection(&options, "Madrid", false).is_none());
    }

    #[test]
    fn resolve_selection_folds_case_for_booleans() {
        let options = vec![option(1, "True", true), option(2, "False", false)];

        assert_eq!(resolve_selection(&options, "true", true).unwrap().id, 1);
        assert_eq!(resolve_selection(&options, "FALSE", true).unwrap().id, 2);
    }

    #[test]
    fn round_percent_rounds_half_up() {
        // 1 of 3 points -> 33.33 -> 33
        assert_eq!(round_percent(1, 3), 33);
        // 2 of 3 points -> 66.66 -> 67
        assert_eq!(round_percent(2, 3), 67);
        // exact half rounds up
        assert_eq!(round_percent(1, 8), 13);
        assert_eq!(round_percent(3, 3), 100);
        assert_eq!(round_percent(0, 5), 0);
    }

    #[test]
    fn round_percent_zero_denominator_is_zero() {
        assert_eq!(round_percent(0, 0), 0);
    }
}
