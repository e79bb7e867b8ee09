// src/models/class.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'classes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
    pub instructor_id: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One row of a class roster, joined with the student's username.
#[derive(Debug, Serialize, FromRow)]
pub struct RosterEntry {
    pub student_id: i64,
    pub username: String,
    pub enrolled_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a class.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

/// DTO for enrolling one student by username.
#[derive(Debug, Deserialize, Validate)]
pub struct EnrollRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
}
