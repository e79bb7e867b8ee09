// src/handlers/quizzes.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::classes::owned_class,
    models::{
        question::QuestionKind,
        quiz::{CreateQuizRequest, Quiz},
    },
    state::AppState,
    store::RecordStore,
    utils::{html::clean_html, jwt::Claims},
};

pub(crate) async fn load_quiz(pool: &PgPool, quiz_id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, class_id, title, show_score, attempts_allowed,
               time_limit_seconds, opens_at, closes_at, created_by, created_at
        FROM quizzes
        WHERE id = $1
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// Creates a quiz together with its questions and options, in one payload
/// and one transaction. Instructor only; the class must belong to the caller.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    if let (Some(opens), Some(closes)) = (payload.opens_at, payload.closes_at) {
        if closes <= opens {
            return Err(AppError::Validation(
                "closes_at must be after opens_at".to_string(),
            ));
        }
    }

    if let Some(limit) = payload.time_limit_seconds {
        if limit <= 0 {
            return Err(AppError::Validation(
                "time_limit_seconds must be positive".to_string(),
            ));
        }
    }

    // Per-question checks before anything is written: field constraints,
    // then the structural rules the derive cannot express.
    let mut kinds: Vec<QuestionKind> = Vec::with_capacity(payload.questions.len());
    for question in &payload.questions {
        if let Err(validation_errors) = question.validate() {
            return Err(AppError::Validation(validation_errors.to_string()));
        }
        for option in &question.options {
            if let Err(validation_errors) = option.validate() {
                return Err(AppError::Validation(validation_errors.to_string()));
            }
        }
        kinds.push(question.check_structure().map_err(AppError::Validation)?);
    }

    owned_class(&pool, payload.class_id, &claims).await?;

    let mut tx = pool.begin().await?;

    let quiz_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes
            (class_id, title, show_score, attempts_allowed, time_limit_seconds,
             opens_at, closes_at, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(payload.class_id)
    .bind(clean_html(&payload.title))
    .bind(payload.show_score)
    .bind(payload.attempts_allowed)
    .bind(payload.time_limit_seconds)
    .bind(payload.opens_at)
    .bind(payload.closes_at)
    .bind(claims.user_id())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::Persistence(e.to_string())
    })?;

    for (index, (question, kind)) in payload.questions.iter().zip(&kinds).enumerate() {
        let question_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO questions (quiz_id, position, kind, prompt, points)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(quiz_id)
        .bind(index as i64 + 1)
        .bind(kind.as_str())
        .bind(clean_html(&question.prompt))
        .bind(question.points)
        .fetch_one(&mut *tx)
        .await?;

        for (opt_index, option) in question.options.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO answer_options (question_id, position, label, is_correct)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(question_id)
            .bind(opt_index as i64 + 1)
            .bind(clean_html(&option.label))
            .bind(option.is_correct)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": quiz_id }))))
}

/// Fetches a quiz with its questions and options, correct flags included.
/// Instructor view for authoring and grading.
pub async fn get_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = load_quiz(&state.pool, quiz_id).await?;
    owned_class(&state.pool, quiz.class_id, &claims).await?;

    let questions = state.store.questions_for_quiz(quiz_id).await?;
    let questions: Vec<serde_json::Value> = questions
        .into_iter()
        .map(|record| {
            serde_json::json!({
                "question": record.question,
                "options": record.options,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "quiz": quiz,
        "questions": questions,
    })))
}

/// Deletes a quiz the caller owns, cascading to questions, options,
/// attempts and answers.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = load_quiz(&pool, quiz_id).await?;
    owned_class(&pool, quiz.class_id, &claims).await?;

    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::Persistence(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
