// src/store/mod.rs

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::attempt::{Attempt, StudentAnswer};
use crate::models::question::QuestionWithOptions;
use crate::models::quiz::Quiz;

/// Write model for one graded answer row.
#[derive(Debug, Clone)]
pub struct NewStudentAnswer {
    pub question_id: i64,
    pub response_text: String,
    pub selected_option_id: Option<i64>,
    pub points_awarded: i64,
    pub is_correct: bool,
}

/// Record store handle consumed by the grading engine.
///
/// The engine never touches a global client; callers inject an
/// implementation, which is what lets the grading tests run against
/// `memory::MemoryStore` instead of a live database.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, AppError>;

    async fn quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError>;

    /// All questions of a quiz in position order, each with its options.
    async fn questions_for_quiz(
        &self,
        quiz_id: i64,
    ) -> Result<Vec<QuestionWithOptions>, AppError>;

    /// Stored answer rows for an attempt, whatever their grading state.
    async fn answers_for_attempt(
        &self,
        attempt_id: i64,
    ) -> Result<Vec<StudentAnswer>, AppError>;

    /// Atomically replaces the attempt's answer rows with `answers` and
    /// stamps the attempt with its aggregate result. Marks the attempt
    /// submitted if it still is in progress; an already-recorded
    /// submission time and elapsed duration are left untouched.
    async fn commit_grades(
        &self,
        attempt_id: i64,
        answers: &[NewStudentAnswer],
        score: i64,
        total_points: i64,
    ) -> Result<(), AppError>;
}
