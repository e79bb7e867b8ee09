// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::attempt::{Attempt, StudentAnswer};
use crate::models::question::{AnswerOption, Question, QuestionWithOptions};
use crate::models::quiz::Quiz;
use crate::store::{NewStudentAnswer, RecordStore};

/// `RecordStore` backed by the application's Postgres pool.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, AppError> {
        let attempt = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT id, quiz_id, student_id, attempt_number, started_at,
                   submitted_at, elapsed_seconds, score, total_points
            FROM attempts
            WHERE id = $1
            "#,
        )
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, class_id, title, show_score, attempts_allowed,
                   time_limit_seconds, opens_at, closes_at, created_by, created_at
            FROM quizzes
            WHERE id = $1
            "#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    async fn questions_for_quiz(
        &self,
        quiz_id: i64,
    ) -> Result<Vec<QuestionWithOptions>, AppError> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, quiz_id, position, kind, prompt, points
            FROM questions
            WHERE quiz_id = $1
            ORDER BY position
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        let options = sqlx::query_as::<_, AnswerOption>(
            r#"
            SELECT o.id, o.question_id, o.position, o.label, o.is_correct
            FROM answer_options o
            JOIN questions q ON o.question_id = q.id
            WHERE q.quiz_id = $1
            ORDER BY o.question_id, o.position
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_question: std::collections::HashMap<i64, Vec<AnswerOption>> =
            std::collections::HashMap::new();
        for option in options {
            by_question.entry(option.question_id).or_default().push(option);
        }

        Ok(questions
            .into_iter()
            .map(|question| {
                let options = by_question.remove(&question.id).unwrap_or_default();
                QuestionWithOptions { question, options }
            })
            .collect())
    }

    async fn answers_for_attempt(
        &self,
        attempt_id: i64,
    ) -> Result<Vec<StudentAnswer>, AppError> {
        let answers = sqlx::query_as::<_, StudentAnswer>(
            r#"
            SELECT id, attempt_id, question_id, response_text,
                   selected_option_id, points_awarded, is_correct
            FROM student_answers
            WHERE attempt_id = $1
            ORDER BY question_id
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(answers)
    }

    async fn commit_grades(
        &self,
        attempt_id: i64,
        answers: &[NewStudentAnswer],
        score: i64,
        total_points: i64,
    ) -> Result<(), AppError> {
        // Delete-then-insert-then-update must be one transaction so a
        // concurrent reader never observes an attempt without its answers.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM student_answers WHERE attempt_id = $1")
            .bind(attempt_id)
            .execute(&mut *tx)
            .await?;

        for answer in answers {
            sqlx::query(
                r#"
                INSERT INTO student_answers
                    (attempt_id, question_id, response_text, selected_option_id,
                     points_awarded, is_correct)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(attempt_id)
            .bind(answer.question_id)
            .bind(&answer.response_text)
            .bind(answer.selected_option_id)
            .bind(answer.points_awarded)
            .bind(answer.is_correct)
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query(
            r#"
            UPDATE attempts
            SET score = $2,
                total_points = $3,
                submitted_at = COALESCE(submitted_at, now()),
                elapsed_seconds = COALESCE(
                    elapsed_seconds,
                    GREATEST(0, EXTRACT(EPOCH FROM (now() - started_at))::BIGINT)
                )
            WHERE id = $1
            "#,
        )
        .bind(attempt_id)
        .bind(score)
        .bind(total_points)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Attempt not found".to_string()));
        }

        tx.commit().await?;

        Ok(())
    }
}
