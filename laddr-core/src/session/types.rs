//! Quiz session, attempt and learner records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a quiz session
///
/// The only transition is `InProgress` to `Completed`; `Completed` is
/// terminal. The stores enforce the transition with a status-guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// One learner's pass through one tier's questions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSession {
    /// Session UUID
    pub id: String,
    pub learner_id: String,
    pub tier_id: String,
    pub status: SessionStatus,
    /// Final score 0-100, written once at completion
    pub score: f64,
    /// Number of attempt facts recorded so far
    pub attempt_count: u32,
    /// Sum of attempt durations, written at completion
    pub time_spent_seconds: u32,
    /// Browser focus-loss telemetry supplied by the client
    pub tab_switches: u32,
    /// Marked suspicious by the integrity rules; advisory, never cleared
    pub flagged: bool,
    pub flag_reason: Option<String>,
    /// Qualitative commentary attached asynchronously after completion
    pub feedback: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Create a fresh in-progress session for a learner on a tier
    pub fn start(learner_id: impl Into<String>, tier_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            learner_id: learner_id.into(),
            tier_id: tier_id.into(),
            status: SessionStatus::InProgress,
            score: 0.0,
            attempt_count: 0,
            time_spent_seconds: 0,
            tab_switches: 0,
            flagged: false,
            flag_reason: None,
            feedback: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }
}

/// One answered question inside a session
///
/// Attempts are immutable facts: created once per submission, never
/// updated or deleted. Duplicate submissions for the same question create
/// duplicate attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    /// Attempt UUID
    pub id: String,
    pub session_id: String,
    pub question_id: String,
    pub selected_option_id: String,
    pub is_correct: bool,
    pub time_taken_seconds: u32,
    pub created_at: DateTime<Utc>,
}

impl Attempt {
    /// Record a new attempt fact timestamped now
    pub fn new(
        session_id: impl Into<String>,
        question_id: impl Into<String>,
        selected_option_id: impl Into<String>,
        is_correct: bool,
        time_taken_seconds: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            question_id: question_id.into(),
            selected_option_id: selected_option_id.into(),
            is_correct,
            time_taken_seconds,
            created_at: Utc::now(),
        }
    }
}

/// Scoring-relevant fields of the learner record
///
/// `xp` and `rank_score` only ever increase, and only at session
/// completion. `status_tier` is derived from `xp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
    pub id: String,
    pub name: String,
    pub xp: u64,
    pub rank_score: f64,
    pub status_tier: String,
    /// Consecutive-day activity streak maintained by a collaborator
    pub streak: u32,
}

impl Learner {
    /// Create a learner with zeroed totals and the entry status badge
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            xp: 0,
            rank_score: 0.0,
            status_tier: "Learner".to_string(),
            streak: 0,
        }
    }
}

/// Append-only audit record of an XP grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpLogEntry {
    /// Auto-incremented database ID
    pub id: i64,
    pub learner_id: String,
    pub amount: u64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}
