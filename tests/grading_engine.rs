// tests/grading_engine.rs
//
// Grading engine behavior against the in-memory record store.

use std::collections::HashMap;

use quizdeck::error::AppError;
use quizdeck::grading::{grade_submission, recalculate};
use quizdeck::models::question::QuestionKind;
use quizdeck::store::RecordStore;
use quizdeck::store::memory::MemoryStore;

fn answers(pairs: &[(i64, &str)]) -> HashMap<i64, String> {
    pairs
        .iter()
        .map(|(id, text)| (*id, text.to_string()))
        .collect()
}

/// One single-select geography question worth `points`, correct answer
/// "Paris". Returns the question id.
fn geo_question(store: &MemoryStore, quiz_id: i64, points: i64) -> i64 {
    store.add_question(
        quiz_id,
        QuestionKind::Single,
        points,
        &[("Paris", true), ("Rome", false), ("Madrid", false)],
    )
}

#[tokio::test]
async fn unanswered_attempt_scores_zero() {
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Geography");
    geo_question(&store, quiz, 5);
    geo_question(&store, quiz, 5);
    let attempt = store.add_attempt(quiz, 1);

    let outcome = grade_submission(&store, attempt, &HashMap::new())
        .await
        .unwrap();

    assert_eq!(outcome.score, 0);
    assert_eq!(outcome.total_points, 10);
    assert_eq!(outcome.answered_count, 0);
    assert_eq!(outcome.graded_count, 0);
}

#[tokio::test]
async fn all_correct_scores_one_hundred() {
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Geography");
    let q1 = geo_question(&store, quiz, 1);
    let q2 = store.add_question(
        quiz,
        QuestionKind::Boolean,
        4,
        &[("True", true), ("False", false)],
    );
    let attempt = store.add_attempt(quiz, 1);

    let outcome = grade_submission(&store, attempt, &answers(&[(q1, "Paris"), (q2, "True")]))
        .await
        .unwrap();

    assert_eq!(outcome.score, 100);
    assert_eq!(outcome.total_points, 5);
    assert_eq!(outcome.answered_count, 2);
    assert_eq!(outcome.graded_count, 2);
    assert_eq!(outcome.essay_count, 0);
}

#[tokio::test]
async fn partial_credit_rounds_half_up() {
    // Two questions worth 1 and 2 points; correct on the first only.
    // 1 of 3 points -> 33.
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Geography");
    let q1 = geo_question(&store, quiz, 1);
    let q2 = geo_question(&store, quiz, 2);
    let attempt = store.add_attempt(quiz, 1);

    let outcome = grade_submission(&store, attempt, &answers(&[(q1, "Paris"), (q2, "Rome")]))
        .await
        .unwrap();

    assert_eq!(outcome.score, 33);
    assert_eq!(outcome.total_points, 3);
    assert_eq!(outcome.answered_count, 2);
}

#[tokio::test]
async fn boolean_answers_match_case_insensitively() {
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Geography");
    let q1 = store.add_question(
        quiz,
        QuestionKind::Boolean,
        2,
        &[("True", true), ("False", false)],
    );
    let attempt = store.add_attempt(quiz, 1);

    // "Ghana is in Africa" answered "true" in any case counts as correct.
    let outcome = grade_submission(&store, attempt, &answers(&[(q1, "true")]))
        .await
        .unwrap();

    assert_eq!(outcome.score, 100);
}

#[tokio::test]
async fn single_select_matching_is_case_sensitive() {
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Geography");
    let q1 = geo_question(&store, quiz, 1);
    let attempt = store.add_attempt(quiz, 1);

    // "paris" does not exactly match the option "Paris", so the question
    // counts as unanswered rather than correct or erroneous.
    let outcome = grade_submission(&store, attempt, &answers(&[(q1, "paris")]))
        .await
        .unwrap();

    assert_eq!(outcome.score, 0);
    assert_eq!(outcome.answered_count, 0);
}

#[tokio::test]
async fn unmatched_answer_text_counts_as_unanswered() {
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Geography");
    let q1 = geo_question(&store, quiz, 1);
    let q2 = geo_question(&store, quiz, 1);
    let attempt = store.add_attempt(quiz, 1);

    let outcome = grade_submission(
        &store,
        attempt,
        &answers(&[(q1, "Paris"), (q2, "Lisbon")]),
    )
    .await
    .unwrap();

    assert_eq!(outcome.answered_count, 1);
    assert_eq!(outcome.score, 50);
}

#[tokio::test]
async fn blank_answers_count_as_unanswered() {
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Geography");
    let q1 = geo_question(&store, quiz, 1);
    let attempt = store.add_attempt(quiz, 1);

    let outcome = grade_submission(&store, attempt, &answers(&[(q1, "   ")]))
        .await
        .unwrap();

    assert_eq!(outcome.answered_count, 0);
    assert_eq!(outcome.score, 0);
}

#[tokio::test]
async fn essay_only_quiz_scores_zero_pending_review() {
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Composition");
    let q1 = store.add_question(quiz, QuestionKind::Essay, 10, &[]);
    let q2 = store.add_question(quiz, QuestionKind::Essay, 10, &[]);
    let attempt = store.add_attempt(quiz, 1);

    let outcome = grade_submission(
        &store,
        attempt,
        &answers(&[(q1, "An essay about rivers."), (q2, "Another essay.")]),
    )
    .await
    .unwrap();

    assert_eq!(outcome.score, 0);
    assert_eq!(outcome.total_points, 20);
    assert_eq!(outcome.essay_count, 2);
    assert_eq!(outcome.graded_count, 0);

    // Essay rows persist at zero/incorrect until manually reviewed.
    let stored = store.stored_answers(attempt);
    assert_eq!(stored.len(), 2);
    assert!(stored
        .iter()
        .all(|a| a.points_awarded == Some(0) && a.is_correct == Some(false)));
}

#[tokio::test]
async fn quiz_with_no_questions_scores_zero() {
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Empty");
    let attempt = store.add_attempt(quiz, 1);

    let outcome = grade_submission(&store, attempt, &HashMap::new())
        .await
        .unwrap();

    assert_eq!(outcome.score, 0);
    assert_eq!(outcome.total_points, 0);
}

#[tokio::test]
async fn recalculate_is_idempotent() {
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Geography");
    let q1 = geo_question(&store, quiz, 1);
    let q2 = geo_question(&store, quiz, 2);
    let attempt = store.add_attempt(quiz, 1);

    grade_submission(&store, attempt, &answers(&[(q1, "Paris"), (q2, "Rome")]))
        .await
        .unwrap();

    let first = recalculate(&store, attempt).await.unwrap();
    let second = recalculate(&store, attempt).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.score, 33);
    assert_eq!(first.total_points, 3);
}

#[tokio::test]
async fn recalculate_grades_autosaved_answers() {
    // An attempt whose submission never arrived still has autosaved raw
    // answers; the bulk "calculate pending scores" path grades those.
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Geography");
    let q1 = geo_question(&store, quiz, 1);
    let attempt = store.add_attempt(quiz, 1);
    store.seed_answer(attempt, q1, "Paris");

    let outcome = recalculate(&store, attempt).await.unwrap();

    assert_eq!(outcome.score, 100);
    assert_eq!(outcome.answered_count, 1);
}

#[tokio::test]
async fn regrading_resolves_against_current_option_text() {
    // The stored raw answer is display text; renaming an option after
    // submission orphans answers that pointed at the old wording.
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Geography");
    let q1 = geo_question(&store, quiz, 1);
    let attempt = store.add_attempt(quiz, 1);

    let first = grade_submission(&store, attempt, &answers(&[(q1, "Paris")]))
        .await
        .unwrap();
    assert_eq!(first.score, 100);

    let correct_option_id = store.stored_answers(attempt)[0]
        .selected_option_id
        .unwrap();
    store.rename_option(quiz, correct_option_id, "Paris, France");

    let second = recalculate(&store, attempt).await.unwrap();
    assert_eq!(second.score, 0);
    assert_eq!(second.answered_count, 0);
}

#[tokio::test]
async fn regrading_replaces_prior_answer_rows() {
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Geography");
    let q1 = geo_question(&store, quiz, 1);
    let q2 = geo_question(&store, quiz, 1);
    let attempt = store.add_attempt(quiz, 1);

    grade_submission(&store, attempt, &answers(&[(q1, "Paris"), (q2, "Rome")]))
        .await
        .unwrap();
    assert_eq!(store.stored_answers(attempt).len(), 2);

    // A second grading pass with fewer answers leaves no stale rows behind.
    grade_submission(&store, attempt, &answers(&[(q1, "Rome")]))
        .await
        .unwrap();

    let stored = store.stored_answers(attempt);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].question_id, q1);
    assert_eq!(stored[0].points_awarded, Some(0));
}

#[tokio::test]
async fn grading_marks_attempt_submitted_and_scored() {
    let store = MemoryStore::new();
    let quiz = store.add_quiz("Geography");
    let q1 = geo_question(&store, quiz, 2);
    let attempt = store.add_attempt(quiz, 1);

    grade_submission(&store, attempt, &answers(&[(q1, "Paris")]))
        .await
        .unwrap();

    let stored = store.attempt(attempt).await.unwrap().unwrap();
    assert!(stored.submitted_at.is_some());
    assert_eq!(stored.score, Some(100));
    assert_eq!(stored.total_points, Some(2));
}

#[tokio::test]
async fn missing_attempt_is_not_found() {
    let store = MemoryStore::new();

    let err = grade_submission(&store, 999, &HashMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}
