//! HTTP server module

mod api;
mod quiz;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use api::HealthResponse;
pub use quiz::{
    AttemptView, ChapterView, CompleteQuizRequest, CompleteQuizResponse, ErrorResponse,
    LEARNER_ID_HEADER, LockedResponse, ReportsResponse, SessionDetailResponse, SessionView,
    StartQuizRequest, SubmitAnswerRequest, SubmitAnswerResponse, TierView, TopicView,
};

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/quiz/start", post(quiz::start_quiz))
        .route("/quiz/submit", post(quiz::submit_answer))
        .route("/quiz/complete", post(quiz::complete_quiz))
        .route("/quiz/session/:id", get(quiz::get_session))
        .route("/quiz/reports", get(quiz::list_reports))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
