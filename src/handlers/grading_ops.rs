// src/handlers/grading_ops.rs
//
// Instructor-side grading actions: rescoring attempts, the bulk
// "calculate pending scores" sweep, manual essay grading and the results
// dashboard.

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    grading,
    handlers::{attempts::load_attempt, classes::owned_class, quizzes::load_quiz},
    models::attempt::{AttemptSummary, GradeEssayRequest},
    state::AppState,
    utils::jwt::Claims,
};
use validator::Validate;

/// Re-runs grading for one attempt against its stored raw answers.
pub async fn recalculate_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = load_attempt(&state.pool, attempt_id).await?;
    let quiz = load_quiz(&state.pool, attempt.quiz_id).await?;
    owned_class(&state.pool, quiz.class_id, &claims).await?;

    let outcome = grading::recalculate(state.store.as_ref(), attempt_id).await?;

    Ok(Json(serde_json::json!({
        "score": outcome.score,
        "total_points": outcome.total_points,
        "essay_count": outcome.essay_count,
    })))
}

/// Grades every attempt of a quiz that has no score yet: the batch
/// "calculate pending scores" action. Picks up attempts whose submission
/// never arrived (expired timers, lost connections) from their autosaved
/// answers.
pub async fn recalculate_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = load_quiz(&state.pool, quiz_id).await?;
    owned_class(&state.pool, quiz.class_id, &claims).await?;

    let pending: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM attempts WHERE quiz_id = $1 AND score IS NULL")
            .bind(quiz_id)
            .fetch_all(&state.pool)
            .await?;

    let mut recalculated = 0;
    let mut essays_pending = 0;
    for attempt_id in &pending {
        let outcome = grading::recalculate(state.store.as_ref(), *attempt_id).await?;
        recalculated += 1;
        essays_pending += outcome.essay_count;
    }

    tracing::info!(
        "Recalculated {} pending attempts for quiz {}",
        recalculated,
        quiz_id
    );

    Ok(Json(serde_json::json!({
        "recalculated": recalculated,
        "essays_pending": essays_pending,
    })))
}

/// Helper row for manual grading: an answer joined with its question.
#[derive(sqlx::FromRow)]
struct EssayAnswerRow {
    attempt_id: i64,
    kind: String,
    question_points: i64,
    quiz_id: i64,
}

/// Manually grades one essay answer and rescores its attempt in the same
/// transaction. The only path by which an essay earns points.
pub async fn grade_essay(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(answer_id): Path<i64>,
    Json(payload): Json<GradeEssayRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let row = sqlx::query_as::<_, EssayAnswerRow>(
        r#"
        SELECT a.attempt_id, q.kind, q.points AS question_points, q.quiz_id
        FROM student_answers a
        JOIN questions q ON q.id = a.question_id
        WHERE a.id = $1
        "#,
    )
    .bind(answer_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound("Answer not found".to_string()))?;

    let quiz = load_quiz(&state.pool, row.quiz_id).await?;
    owned_class(&state.pool, quiz.class_id, &claims).await?;

    if row.kind != "essay" {
        return Err(AppError::Validation(
            "Only essay answers can be graded manually".to_string(),
        ));
    }

    if payload.points > row.question_points {
        return Err(AppError::Validation(format!(
            "Awarded points exceed the question's value of {}",
            row.question_points
        )));
    }

    let attempt = load_attempt(&state.pool, row.attempt_id).await?;
    let total_points = attempt.total_points.ok_or(AppError::Validation(
        "Attempt has not been graded yet".to_string(),
    ))?;

    let mut tx = state.pool.begin().await?;

    sqlx::query(
        "UPDATE student_answers SET points_awarded = $2, is_correct = $3 WHERE id = $1",
    )
    .bind(answer_id)
    .bind(payload.points)
    .bind(payload.points == row.question_points)
    .execute(&mut *tx)
    .await?;

    let earned: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(points_awarded), 0)::BIGINT FROM student_answers WHERE attempt_id = $1",
    )
    .bind(row.attempt_id)
    .fetch_one(&mut *tx)
    .await?;

    let score = grading::round_percent(earned, total_points);

    sqlx::query("UPDATE attempts SET score = $2 WHERE id = $1")
        .bind(row.attempt_id)
        .bind(score)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "score": score,
        "total_points": total_points,
        "points_awarded": payload.points,
    })))
}

/// Roster-wide results for one quiz: every attempt with its score and how
/// many essay answers still sit at zero awaiting review.
pub async fn quiz_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = load_quiz(&state.pool, quiz_id).await?;
    owned_class(&state.pool, quiz.class_id, &claims).await?;

    let rows = sqlx::query_as::<_, AttemptSummary>(
        r#"
        SELECT a.id AS attempt_id, a.student_id, u.username, a.attempt_number,
               a.started_at, a.submitted_at, a.score, a.total_points,
               (SELECT COUNT(*)
                FROM student_answers sa
                JOIN questions q ON q.id = sa.question_id
                WHERE sa.attempt_id = a.id
                  AND q.kind = 'essay'
                  AND sa.points_awarded = 0
                  AND sa.is_correct = FALSE) AS pending_essays
        FROM attempts a
        JOIN users u ON u.id = a.student_id
        WHERE a.quiz_id = $1
        ORDER BY u.username, a.attempt_number
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load quiz results: {:?}", e);
        AppError::Persistence(e.to_string())
    })?;

    Ok(Json(rows))
}
