// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'attempts' table in the database.
/// One learner's instance of taking a quiz.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub quiz_id: i64,
    pub student_id: i64,

    /// Ordinal attempt number, unique per learner+quiz.
    pub attempt_number: i64,

    pub started_at: chrono::DateTime<chrono::Utc>,

    /// Null while the attempt is in progress.
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,

    pub elapsed_seconds: Option<i64>,

    /// Aggregate percentage score, null until graded.
    pub score: Option<i64>,

    /// Total possible points for the quiz at grading time.
    pub total_points: Option<i64>,
}

impl Attempt {
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }
}

/// Represents the 'student_answers' table: one response to one question
/// within one attempt. At most one row per (attempt, question).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,

    /// The raw submitted display text, stored verbatim. Grading re-resolves
    /// it against the question's current options.
    pub response_text: String,

    /// The resolved option for selectable questions, null for essays and
    /// for answers whose text matched no option.
    pub selected_option_id: Option<i64>,

    /// Null until graded.
    pub points_awarded: Option<i64>,
    pub is_correct: Option<bool>,
}

/// DTO for autosaving one in-progress answer.
#[derive(Debug, Deserialize, Validate)]
pub struct SaveAnswerRequest {
    pub question_id: i64,
    #[validate(length(max = 20000))]
    pub response: String,
}

/// DTO for submitting an attempt: question id -> raw answer text.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: HashMap<i64, String>,
}

/// DTO for manually grading one essay answer.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeEssayRequest {
    #[validate(range(min = 0, max = 1000))]
    pub points: i64,
}

/// One row of the instructor results dashboard.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptSummary {
    pub attempt_id: i64,
    pub student_id: i64,
    pub username: String,
    pub attempt_number: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub score: Option<i64>,
    pub total_points: Option<i64>,
    /// Essay answers still awaiting a manual grade.
    pub pending_essays: i64,
}
