//! Quiz REST API endpoints
//!
//! Caller identity arrives in the `X-Learner-Id` header; resolving who the
//! caller actually is happens upstream. A request without the header is
//! rejected with a 400 before any handler logic runs.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use laddr_core::{
    AdaptiveSignal, Attempt, CatalogStore, Chapter, GateError, QuizSession, RecorderError,
    ScoringError, SessionStatus, StoreError, Tier, Topic,
};

use crate::state::AppState;

/// Header carrying the caller's learner id
pub const LEARNER_ID_HEADER: &str = "x-learner-id";

/// Most recent completed sessions returned by the reports endpoint
const REPORT_LIMIT: u32 = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Body of a 403 when a prerequisite threshold is unmet
#[derive(Debug, Serialize, Deserialize)]
pub struct LockedResponse {
    pub message: String,
    pub code: String,
}

/// Session record as exposed over the wire
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub learner_id: String,
    pub tier_id: String,
    pub status: SessionStatus,
    pub score: f64,
    pub attempt_count: u32,
    pub time_spent_seconds: u32,
    pub tab_switches: u32,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub feedback: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<QuizSession> for SessionView {
    fn from(session: QuizSession) -> Self {
        Self {
            id: session.id,
            learner_id: session.learner_id,
            tier_id: session.tier_id,
            status: session.status,
            score: session.score,
            attempt_count: session.attempt_count,
            time_spent_seconds: session.time_spent_seconds,
            tab_switches: session.tab_switches,
            flagged: session.flagged,
            flag_reason: session.flag_reason,
            feedback: session.feedback,
            started_at: session.started_at,
            ended_at: session.ended_at,
        }
    }
}

/// One recorded answer as exposed over the wire
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptView {
    pub id: String,
    pub question_id: String,
    pub selected_option_id: String,
    pub is_correct: bool,
    pub time_taken_seconds: u32,
    pub created_at: DateTime<Utc>,
}

impl From<Attempt> for AttemptView {
    fn from(attempt: Attempt) -> Self {
        Self {
            id: attempt.id,
            question_id: attempt.question_id,
            selected_option_id: attempt.selected_option_id,
            is_correct: attempt.is_correct,
            time_taken_seconds: attempt.time_taken_seconds,
            created_at: attempt.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierView {
    pub id: String,
    pub name: String,
    pub order_index: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterView {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicView {
    pub id: String,
    pub name: String,
    pub grade_band: Option<String>,
}

/// Request body for starting a quiz
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizRequest {
    pub tier_id: String,
}

/// Request body for submitting one answer
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub session_id: String,
    pub question_id: String,
    pub selected_option_id: String,
    /// Seconds the learner spent on this question
    pub time_taken: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerResponse {
    pub is_correct: bool,
    pub correct_option_id: String,
    pub feedback: String,
    pub adaptive_signal: AdaptiveSignal,
}

/// Request body for completing a session
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteQuizRequest {
    pub session_id: String,
    /// Browser focus-loss count reported by the client; zero when omitted
    #[serde(default)]
    pub tab_switches: u32,
}

/// What the learner sees right after completing; qualitative feedback is
/// attached to the session later, not returned here
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteQuizResponse {
    pub message: String,
    pub score: f64,
    pub xp_earned: u64,
    pub rank_score_earned: f64,
    pub new_status: String,
    pub next_level_unlock: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetailResponse {
    pub session: SessionView,
    pub attempts: Vec<AttemptView>,
    pub tier: TierView,
    pub chapter: ChapterView,
    pub topic: TopicView,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsResponse {
    pub sessions: Vec<SessionView>,
}

/// Extract the caller's learner id from the identity header
fn learner_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LEARNER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn missing_learner_header() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "Missing X-Learner-Id header".into(),
            code: "VALIDATION".into(),
        }),
    )
        .into_response()
}

/// POST /quiz/start
pub async fn start_quiz(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<StartQuizRequest>,
) -> impl IntoResponse {
    let Some(learner_id) = learner_from_headers(&headers) else {
        return missing_learner_header();
    };

    match state.gate.authorize_start(&learner_id, &request.tier_id) {
        Ok(session) => Json(SessionView::from(session)).into_response(),
        Err(err @ GateError::Locked { .. }) => (
            StatusCode::FORBIDDEN,
            Json(LockedResponse {
                message: err.to_string(),
                code: "TIER_LOCKED".into(),
            }),
        )
            .into_response(),
        Err(err @ (GateError::LearnerNotFound(_) | GateError::TierNotFound(_))) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: err.to_string(),
                code: "NOT_FOUND".into(),
            }),
        )
            .into_response(),
        Err(GateError::Store(err)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
                code: "INTERNAL".into(),
            }),
        )
            .into_response(),
    }
}

/// POST /quiz/submit
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SubmitAnswerRequest>,
) -> impl IntoResponse {
    if learner_from_headers(&headers).is_none() {
        return missing_learner_header();
    }

    match state.recorder.record(
        &request.session_id,
        &request.question_id,
        &request.selected_option_id,
        request.time_taken,
    ) {
        Ok(outcome) => Json(SubmitAnswerResponse {
            is_correct: outcome.is_correct,
            correct_option_id: outcome.correct_option_id,
            feedback: outcome.feedback,
            adaptive_signal: outcome.signal,
        })
        .into_response(),
        Err(err @ (RecorderError::SessionNotFound(_) | RecorderError::QuestionNotFound(_))) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: err.to_string(),
                code: "NOT_FOUND".into(),
            }),
        )
            .into_response(),
        Err(err @ RecorderError::SessionCompleted(_)) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: err.to_string(),
                code: "ALREADY_COMPLETED".into(),
            }),
        )
            .into_response(),
        Err(RecorderError::Store(err)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
                code: "INTERNAL".into(),
            }),
        )
            .into_response(),
    }
}

/// POST /quiz/complete
pub async fn complete_quiz(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CompleteQuizRequest>,
) -> impl IntoResponse {
    if learner_from_headers(&headers).is_none() {
        return missing_learner_header();
    }

    match state
        .aggregator
        .complete(&request.session_id, request.tab_switches)
    {
        Ok(summary) => Json(CompleteQuizResponse {
            message: "Quiz completed successfully".into(),
            score: summary.score,
            xp_earned: summary.xp_earned,
            rank_score_earned: summary.rank_score_earned,
            new_status: summary.new_status,
            next_level_unlock: summary.next_level_unlock,
        })
        .into_response(),
        Err(err @ ScoringError::AlreadyCompleted(_)) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: err.to_string(),
                code: "ALREADY_COMPLETED".into(),
            }),
        )
            .into_response(),
        Err(
            err @ (ScoringError::SessionNotFound(_)
            | ScoringError::LearnerNotFound(_)
            | ScoringError::TierNotFound(_)),
        ) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: err.to_string(),
                code: "NOT_FOUND".into(),
            }),
        )
            .into_response(),
        Err(ScoringError::Store(err)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
                code: "INTERNAL".into(),
            }),
        )
            .into_response(),
    }
}

/// Catalog rows surrounding a session's tier
struct TierContext {
    tier: Tier,
    chapter: Chapter,
    topic: Topic,
}

fn tier_context(
    catalog: &dyn CatalogStore,
    tier_id: &str,
) -> Result<Option<TierContext>, StoreError> {
    let Some(tier) = catalog.tier(tier_id)? else {
        return Ok(None);
    };
    let Some(chapter) = catalog.chapter(&tier.chapter_id)? else {
        return Ok(None);
    };
    let Some(topic) = catalog.topic(&chapter.topic_id)? else {
        return Ok(None);
    };
    Ok(Some(TierContext {
        tier,
        chapter,
        topic,
    }))
}

/// GET /quiz/session/:id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if learner_from_headers(&headers).is_none() {
        return missing_learner_header();
    }

    let session = match state.store.session(&id) {
        Ok(Some(session)) => session,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Session not found: {}", id),
                    code: "NOT_FOUND".into(),
                }),
            )
                .into_response();
        }
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                    code: "INTERNAL".into(),
                }),
            )
                .into_response();
        }
    };

    let context = match tier_context(state.catalog.as_ref(), &session.tier_id) {
        Ok(Some(context)) => context,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Catalog context not found for tier: {}", session.tier_id),
                    code: "NOT_FOUND".into(),
                }),
            )
                .into_response();
        }
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                    code: "INTERNAL".into(),
                }),
            )
                .into_response();
        }
    };

    let attempts = match state.store.attempts_for_session(&id) {
        Ok(attempts) => attempts,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                    code: "INTERNAL".into(),
                }),
            )
                .into_response();
        }
    };

    Json(SessionDetailResponse {
        session: SessionView::from(session),
        attempts: attempts.into_iter().map(AttemptView::from).collect(),
        tier: TierView {
            id: context.tier.id,
            name: context.tier.name,
            order_index: context.tier.order_index,
        },
        chapter: ChapterView {
            id: context.chapter.id,
            name: context.chapter.name,
        },
        topic: TopicView {
            id: context.topic.id,
            name: context.topic.name,
            grade_band: context.topic.grade_band,
        },
    })
    .into_response()
}

/// GET /quiz/reports
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(learner_id) = learner_from_headers(&headers) else {
        return missing_learner_header();
    };

    match state
        .store
        .recent_completed_for_learner(&learner_id, REPORT_LIMIT)
    {
        Ok(sessions) => Json(ReportsResponse {
            sessions: sessions.into_iter().map(SessionView::from).collect(),
        })
        .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
                code: "INTERNAL".into(),
            }),
        )
            .into_response(),
    }
}
