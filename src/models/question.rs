// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Question kind. Single-select and boolean questions carry answer options;
/// essay questions have none and are never auto-scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Single,
    Boolean,
    Essay,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Single => "single",
            QuestionKind::Boolean => "boolean",
            QuestionKind::Essay => "essay",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(QuestionKind::Single),
            "boolean" => Some(QuestionKind::Boolean),
            "essay" => Some(QuestionKind::Essay),
            _ => None,
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// Ordinal position, unique within the quiz.
    pub position: i64,

    /// Question kind: 'single', 'boolean' or 'essay'.
    pub kind: String,

    /// The text content of the question.
    pub prompt: String,

    /// Positive point value; full points or zero are awarded, nothing partial.
    pub points: i64,
}

/// Represents the 'answer_options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub question_id: i64,
    pub position: i64,

    /// Display text the learner sees and submits.
    pub label: String,

    /// Exactly one option per selectable question is flagged correct.
    pub is_correct: bool,
}

/// A question bundled with its options, as the grading engine consumes it.
#[derive(Debug, Clone)]
pub struct QuestionWithOptions {
    pub question: Question,
    pub options: Vec<AnswerOption>,
}

/// DTO for sending a question to a quiz taker (correct flags withheld).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub position: i64,
    pub kind: String,
    pub prompt: String,
    pub points: i64,
    pub options: Vec<PublicOption>,
}

#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub position: i64,
    pub label: String,
}

impl PublicQuestion {
    pub fn from_record(record: QuestionWithOptions) -> Self {
        let QuestionWithOptions { question, options } = record;
        Self {
            id: question.id,
            position: question.position,
            kind: question.kind,
            prompt: question.prompt,
            points: question.points,
            options: options
                .into_iter()
                .map(|o| PublicOption {
                    id: o.id,
                    position: o.position,
                    label: o.label,
                })
                .collect(),
        }
    }
}

/// DTO for one option inside a question authoring payload.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOptionRequest {
    #[validate(length(min = 1, max = 500))]
    pub label: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for one question inside a quiz authoring payload.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub kind: String,
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
    #[validate(range(min = 1, max = 1000))]
    pub points: i64,
    #[serde(default)]
    pub options: Vec<CreateOptionRequest>,
}

impl CreateQuestionRequest {
    /// Structural checks the derive cannot express: kind is known,
    /// selectable kinds carry ordered options with exactly one correct,
    /// essay questions carry none.
    pub fn check_structure(&self) -> Result<QuestionKind, String> {
        let kind = QuestionKind::parse(&self.kind)
            .ok_or_else(|| format!("Unknown question kind '{}'", self.kind))?;

        match kind {
            QuestionKind::Single | QuestionKind::Boolean => {
                if self.options.len() < 2 {
                    return Err("Selectable questions need at least two options".to_string());
                }
                let correct = self.options.iter().filter(|o| o.is_correct).count();
                if correct != 1 {
                    return Err(format!(
                        "Selectable questions need exactly one correct option, got {}",
                        correct
                    ));
                }
            }
            QuestionKind::Essay => {
                if !self.options.is_empty() {
                    return Err("Essay questions cannot have options".to_string());
                }
            }
        }

        Ok(kind)
    }
}
