// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::CreateQuestionRequest;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub class_id: i64,
    pub title: String,

    /// Whether students may see their own score once graded.
    pub show_score: bool,

    /// Allowed attempt count; zero or negative means unlimited.
    pub attempts_allowed: i64,

    /// Null means untimed.
    pub time_limit_seconds: Option<i64>,

    /// Scheduling window. Null bounds are open-ended.
    pub opens_at: Option<chrono::DateTime<chrono::Utc>>,
    pub closes_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_by: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Quiz {
    /// Whether the scheduling window admits new attempts at `now`.
    pub fn is_open_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        if let Some(opens) = self.opens_at {
            if now < opens {
                return false;
            }
        }
        if let Some(closes) = self.closes_at {
            if now > closes {
                return false;
            }
        }
        true
    }

    pub fn unlimited_attempts(&self) -> bool {
        self.attempts_allowed <= 0
    }
}

/// DTO for authoring a quiz together with its questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    pub class_id: i64,
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[serde(default = "default_show_score")]
    pub show_score: bool,
    #[serde(default = "default_attempts_allowed")]
    pub attempts_allowed: i64,
    pub time_limit_seconds: Option<i64>,
    pub opens_at: Option<chrono::DateTime<chrono::Utc>>,
    pub closes_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Validated question-by-question in the handler.
    pub questions: Vec<CreateQuestionRequest>,
}

fn default_show_score() -> bool {
    true
}

fn default_attempts_allowed() -> i64 {
    1
}
