// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempts, auth, classes, grading_ops, quizzes},
    state::AppState,
    utils::jwt::{auth_middleware, instructor_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, classes, quizzes, attempts, answers).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, record store, config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // let governor_conf = GovernorConfigBuilder::default()
    //     .per_second(2)
    //     .burst_size(5)
    //     .finish()
    //     .unwrap();

    // let governor_conf = Arc::new(governor_conf);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));
        // .layer(GovernorLayer::new(governor_conf));

    let class_routes = Router::new()
        .route("/", get(classes::list_classes).post(classes::create_class))
        .route("/{id}/quizzes", get(classes::list_class_quizzes))
        // Roster management is instructor-only
        .merge(
            Router::new()
                .route("/{id}/roster", get(classes::get_roster))
                .route("/{id}/enroll", post(classes::enroll_student))
                .layer(middleware::from_fn(instructor_middleware)),
        );

    let quiz_routes = Router::new()
        .route("/{id}/attempts", post(attempts::start_attempt))
        // Authoring, results and rescoring are instructor-only
        .merge(
            Router::new()
                .route("/", post(quizzes::create_quiz))
                .route("/{id}", get(quizzes::get_quiz).delete(quizzes::delete_quiz))
                .route("/{id}/results", get(grading_ops::quiz_results))
                .route("/{id}/recalculate", post(grading_ops::recalculate_quiz))
                .layer(middleware::from_fn(instructor_middleware)),
        );

    let attempt_routes = Router::new()
        .route("/{id}/answers", put(attempts::save_answer))
        .route("/{id}/submit", post(attempts::submit_attempt))
        .route("/{id}/result", get(attempts::get_result))
        .merge(
            Router::new()
                .route("/{id}/recalculate", post(grading_ops::recalculate_attempt))
                .layer(middleware::from_fn(instructor_middleware)),
        );

    let answer_routes = Router::new()
        .route("/{id}/grade", put(grading_ops::grade_essay))
        .layer(middleware::from_fn(instructor_middleware));

    // Everything except /api/auth requires a valid bearer token
    let protected = Router::new()
        .nest("/api/classes", class_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/answers", answer_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .merge(protected)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
