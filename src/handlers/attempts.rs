// src/handlers/attempts.rs

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
    config::SUBMIT_GRACE_SECONDS,
    error::AppError,
    grading,
    handlers::{classes::is_enrolled, quizzes::load_quiz},
    models::{
        attempt::{Attempt, SaveAnswerRequest, SubmitAttemptRequest},
        question::PublicQuestion,
    },
    state::AppState,
    store::RecordStore,
    utils::jwt::Claims,
};

pub(crate) async fn load_attempt(pool: &PgPool, attempt_id: i64) -> Result<Attempt, AppError> {
    sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, quiz_id, student_id, attempt_number, started_at,
               submitted_at, elapsed_seconds, score, total_points
        FROM attempts
        WHERE id = $1
        "#,
    )
    .bind(attempt_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))
}

fn owned_attempt(attempt: &Attempt, claims: &Claims) -> Result<(), AppError> {
    if attempt.student_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Attempt belongs to another student".to_string(),
        ));
    }
    Ok(())
}

/// Begins (or resumes) an attempt at a quiz.
///
/// Enforces enrollment, the scheduling window and the attempt limit. If an
/// attempt is already in progress it is returned instead of opening a new
/// one, so a learner who navigated away can pick up where they left off.
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = load_quiz(&state.pool, quiz_id).await?;
    let student_id = claims.user_id();

    if !is_enrolled(&state.pool, quiz.class_id, student_id).await? {
        return Err(AppError::Forbidden(
            "Not enrolled in this class".to_string(),
        ));
    }

    let now = Utc::now();

    let open_attempt = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, quiz_id, student_id, attempt_number, started_at,
               submitted_at, elapsed_seconds, score, total_points
        FROM attempts
        WHERE quiz_id = $1 AND student_id = $2 AND submitted_at IS NULL
        "#,
    )
    .bind(quiz_id)
    .bind(student_id)
    .fetch_optional(&state.pool)
    .await?;

    let attempt = match open_attempt {
        Some(attempt) => attempt,
        None => {
            if !quiz.is_open_at(now) {
                return Err(AppError::Forbidden(
                    "Quiz is not open for attempts".to_string(),
                ));
            }

            let used: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM attempts WHERE quiz_id = $1 AND student_id = $2",
            )
            .bind(quiz_id)
            .bind(student_id)
            .fetch_one(&state.pool)
            .await?;

            if !quiz.unlimited_attempts() && used >= quiz.attempts_allowed {
                return Err(AppError::Forbidden("Attempt limit reached".to_string()));
            }

            sqlx::query_as::<_, Attempt>(
                r#"
                INSERT INTO attempts (quiz_id, student_id, attempt_number)
                VALUES ($1, $2,
                        (SELECT COALESCE(MAX(attempt_number), 0) + 1
                         FROM attempts
                         WHERE quiz_id = $1 AND student_id = $2))
                RETURNING id, quiz_id, student_id, attempt_number, started_at,
                          submitted_at, elapsed_seconds, score, total_points
                "#,
            )
            .bind(quiz_id)
            .bind(student_id)
            .fetch_one(&state.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to start attempt: {:?}", e);
                AppError::Persistence(e.to_string())
            })?
        }
    };

    let questions: Vec<PublicQuestion> = state
        .store
        .questions_for_quiz(quiz_id)
        .await?
        .into_iter()
        .map(PublicQuestion::from_record)
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "attempt": attempt,
            "time_limit_seconds": quiz.time_limit_seconds,
            "questions": questions,
        })),
    ))
}

/// Autosaves one in-progress answer, storing the raw submitted text
/// verbatim and clearing any stale grading fields.
pub async fn save_answer(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SaveAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let attempt = load_attempt(&pool, attempt_id).await?;
    owned_attempt(&attempt, &claims)?;

    if attempt.is_submitted() {
        return Err(AppError::Conflict(
            "Attempt already submitted".to_string(),
        ));
    }

    let question: Option<i64> =
        sqlx::query_scalar("SELECT id FROM questions WHERE id = $1 AND quiz_id = $2")
            .bind(payload.question_id)
            .bind(attempt.quiz_id)
            .fetch_optional(&pool)
            .await?;

    if question.is_none() {
        return Err(AppError::NotFound(
            "Question not found in this quiz".to_string(),
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO student_answers (attempt_id, question_id, response_text)
        VALUES ($1, $2, $3)
        ON CONFLICT (attempt_id, question_id) DO UPDATE
        SET response_text = EXCLUDED.response_text,
            selected_option_id = NULL,
            points_awarded = NULL,
            is_correct = NULL
        "#,
    )
    .bind(attempt_id)
    .bind(payload.question_id)
    .bind(&payload.response)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to autosave answer: {:?}", e);
        AppError::Persistence(e.to_string())
    })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Submits an attempt: hands the raw answer map to the grading engine,
/// which translates, persists and grades in one call.
///
/// The deadline is enforced here, server-side; a submission later than the
/// time limit plus grace is rejected, but its autosaved answers stay stored
/// and are graded by the instructor's bulk recalculation.
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = load_attempt(&state.pool, attempt_id).await?;
    owned_attempt(&attempt, &claims)?;

    if attempt.is_submitted() {
        return Err(AppError::Conflict(
            "Attempt already submitted".to_string(),
        ));
    }

    let quiz = load_quiz(&state.pool, attempt.quiz_id).await?;

    if let Some(limit) = quiz.time_limit_seconds {
        let elapsed = (Utc::now() - attempt.started_at).num_seconds();
        if elapsed > limit + SUBMIT_GRACE_SECONDS {
            return Err(AppError::Validation(
                "Time limit exceeded; saved answers await instructor grading".to_string(),
            ));
        }
    }

    let outcome =
        grading::grade_submission(state.store.as_ref(), attempt_id, &payload.answers).await?;

    if quiz.show_score {
        Ok(Json(serde_json::json!({
            "score": outcome.score,
            "total_points": outcome.total_points,
            "answered_count": outcome.answered_count,
            "pending_review": outcome.essay_count > 0,
        })))
    } else {
        Ok(Json(serde_json::json!({
            "submitted": true,
            "answered_count": outcome.answered_count,
        })))
    }
}

/// Per-question result row, joined with the question for display.
#[derive(sqlx::FromRow, serde::Serialize)]
struct AnswerBreakdown {
    question_id: i64,
    position: i64,
    prompt: String,
    points: i64,
    response_text: String,
    points_awarded: Option<i64>,
    is_correct: Option<bool>,
}

/// Returns the scored attempt with its per-question breakdown.
///
/// Students see their own submitted attempts, and only when the quiz's
/// scoring visibility flag allows. Instructors who own the class see any
/// attempt in it.
pub async fn get_result(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = load_attempt(&pool, attempt_id).await?;
    let quiz = load_quiz(&pool, attempt.quiz_id).await?;

    if claims.is_instructor() {
        crate::handlers::classes::owned_class(&pool, quiz.class_id, &claims).await?;
    } else {
        owned_attempt(&attempt, &claims)?;
        if !attempt.is_submitted() {
            return Err(AppError::Conflict(
                "Attempt is still in progress".to_string(),
            ));
        }
        if !quiz.show_score {
            return Err(AppError::Forbidden(
                "Scores are hidden for this quiz".to_string(),
            ));
        }
    }

    let breakdown = sqlx::query_as::<_, AnswerBreakdown>(
        r#"
        SELECT q.id AS question_id, q.position, q.prompt, q.points,
               a.response_text, a.points_awarded, a.is_correct
        FROM student_answers a
        JOIN questions q ON q.id = a.question_id
        WHERE a.attempt_id = $1
        ORDER BY q.position
        "#,
    )
    .bind(attempt_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load result breakdown: {:?}", e);
        AppError::Persistence(e.to_string())
    })?;

    Ok(Json(serde_json::json!({
        "attempt": attempt,
        "answers": breakdown,
    })))
}
