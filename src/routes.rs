// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, auth, play, quiz, report},
    state::AppState,
    utils::jwt::{creator_middleware, participant_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quizzes, dashboard, play, attempts).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/play", post(auth::play_login));

    // Authoring and reporting: creator scope only.
    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes).post(quiz::upsert_quiz))
        .route("/{id}", get(quiz::get_quiz).delete(quiz::delete_quiz))
        .route("/{id}/live", patch(quiz::set_quiz_live))
        .route("/{id}/report", get(report::quiz_report))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            creator_middleware,
        ));

    let dashboard_routes = Router::new()
        .route("/", get(report::dashboard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            creator_middleware,
        ));

    // Public view is open; starting an attempt needs a participant session.
    let play_routes = Router::new()
        .route("/{code}", get(play::view_quiz))
        .merge(
            Router::new()
                .route("/{code}/attempts", post(attempt::start_attempt))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    participant_middleware,
                )),
        );

    let attempt_routes = Router::new()
        .route("/{id}/submit", post(attempt::submit_attempt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            participant_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api/play", play_routes)
        .nest("/api/attempts", attempt_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
