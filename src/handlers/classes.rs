// src/handlers/classes.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        class::{Class, CreateClassRequest, EnrollRequest, RosterEntry},
        quiz::Quiz,
        user::{ROLE_STUDENT, User},
    },
    utils::jwt::Claims,
};

/// Loads a class and verifies the caller owns it.
pub(crate) async fn owned_class(
    pool: &PgPool,
    class_id: i64,
    claims: &Claims,
) -> Result<Class, AppError> {
    let class = sqlx::query_as::<_, Class>(
        "SELECT id, name, instructor_id, created_at FROM classes WHERE id = $1",
    )
    .bind(class_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Class not found".to_string()))?;

    if class.instructor_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Class belongs to another instructor".to_string(),
        ));
    }

    Ok(class)
}

pub(crate) async fn is_enrolled(
    pool: &PgPool,
    class_id: i64,
    student_id: i64,
) -> Result<bool, AppError> {
    let enrolled: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM enrollments WHERE class_id = $1 AND student_id = $2",
    )
    .bind(class_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?;

    Ok(enrolled.is_some())
}

/// Creates a class owned by the calling instructor.
pub async fn create_class(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.is_instructor() {
        return Err(AppError::Forbidden(
            "Only instructors can create classes".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let class = sqlx::query_as::<_, Class>(
        r#"
        INSERT INTO classes (name, instructor_id)
        VALUES ($1, $2)
        RETURNING id, name, instructor_id, created_at
        "#,
    )
    .bind(&payload.name)
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create class: {:?}", e);
        AppError::Persistence(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(class)))
}

/// Lists the caller's classes: owned for instructors, enrolled for students.
pub async fn list_classes(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let classes = if claims.is_instructor() {
        sqlx::query_as::<_, Class>(
            r#"
            SELECT id, name, instructor_id, created_at
            FROM classes
            WHERE instructor_id = $1
            ORDER BY id DESC
            "#,
        )
        .bind(claims.user_id())
        .fetch_all(&pool)
        .await?
    } else {
        sqlx::query_as::<_, Class>(
            r#"
            SELECT c.id, c.name, c.instructor_id, c.created_at
            FROM classes c
            JOIN enrollments e ON e.class_id = c.id
            WHERE e.student_id = $1
            ORDER BY c.id DESC
            "#,
        )
        .bind(claims.user_id())
        .fetch_all(&pool)
        .await?
    };

    Ok(Json(classes))
}

/// Lists the roster of a class the caller owns.
pub async fn get_roster(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_class(&pool, class_id, &claims).await?;

    let roster = sqlx::query_as::<_, RosterEntry>(
        r#"
        SELECT u.id AS student_id, u.username, e.created_at AS enrolled_at
        FROM enrollments e
        JOIN users u ON u.id = e.student_id
        WHERE e.class_id = $1
        ORDER BY u.username
        "#,
    )
    .bind(class_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list roster: {:?}", e);
        AppError::Persistence(e.to_string())
    })?;

    Ok(Json(roster))
}

/// Enrolls one student, by username, into a class the caller owns.
pub async fn enroll_student(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<i64>,
    Json(payload): Json<EnrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    owned_class(&pool, class_id, &claims).await?;

    let student = sqlx::query_as::<_, User>(
        "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", payload.username)))?;

    if student.role != ROLE_STUDENT {
        return Err(AppError::Validation(format!(
            "User '{}' is not a student",
            payload.username
        )));
    }

    sqlx::query("INSERT INTO enrollments (class_id, student_id) VALUES ($1, $2)")
        .bind(class_id)
        .bind(student.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
                AppError::Conflict(format!(
                    "'{}' is already enrolled in this class",
                    payload.username
                ))
            } else {
                tracing::error!("Failed to enroll student: {:?}", e);
                AppError::Persistence(e.to_string())
            }
        })?;

    Ok(StatusCode::CREATED)
}

/// Lists a class's quizzes. Instructors who own the class see everything;
/// enrolled students see only quizzes whose window has opened.
pub async fn list_class_quizzes(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if claims.is_instructor() {
        owned_class(&pool, class_id, &claims).await?;

        let quizzes = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, class_id, title, show_score, attempts_allowed,
                   time_limit_seconds, opens_at, closes_at, created_by, created_at
            FROM quizzes
            WHERE class_id = $1
            ORDER BY id DESC
            "#,
        )
        .bind(class_id)
        .fetch_all(&pool)
        .await?;

        return Ok(Json(quizzes));
    }

    if !is_enrolled(&pool, class_id, claims.user_id()).await? {
        return Err(AppError::Forbidden(
            "Not enrolled in this class".to_string(),
        ));
    }

    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, class_id, title, show_score, attempts_allowed,
               time_limit_seconds, opens_at, closes_at, created_by, created_at
        FROM quizzes
        WHERE class_id = $1 AND (opens_at IS NULL OR opens_at <= $2)
        ORDER BY id DESC
        "#,
    )
    .bind(class_id)
    .bind(Utc::now())
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}
