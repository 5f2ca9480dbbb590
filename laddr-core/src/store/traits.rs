//! Assessment storage trait

use chrono::{DateTime, Utc};

use crate::session::{Attempt, Learner, QuizSession, XpLogEntry};

use super::error::StoreError;

/// Everything written by the store in one atomic completion
///
/// The store applies the whole record in a single transaction: the status
/// compare-and-swap on the session, the learner total updates, and the XP
/// log append. A session that is already `COMPLETED` makes the whole call
/// fail with [`StoreError::AlreadyCompleted`] and writes nothing, so XP can
/// never be granted twice for one session.
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub session_id: String,
    pub learner_id: String,
    pub score: f64,
    pub time_spent_seconds: u32,
    pub tab_switches: u32,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub ended_at: DateTime<Utc>,
    /// XP added to the learner total
    pub xp_delta: u64,
    /// Rank score added to the learner total
    pub rank_score_delta: f64,
    /// Status badge derived from the learner's new XP total
    pub new_status_tier: String,
    /// Human-readable reason stored in the XP log
    pub xp_reason: String,
}

/// Assessment storage trait
pub trait AssessmentStore: Send + Sync {
    fn insert_session(&self, session: &QuizSession) -> Result<(), StoreError>;
    fn session(&self, id: &str) -> Result<Option<QuizSession>, StoreError>;

    /// Highest score among the learner's completed sessions on a tier
    fn best_completed_score(
        &self,
        learner_id: &str,
        tier_id: &str,
    ) -> Result<Option<f64>, StoreError>;

    /// Number of completed sessions across all tiers for a learner
    fn completed_session_count(&self, learner_id: &str) -> Result<u32, StoreError>;

    /// Completed sessions for a learner, newest first
    fn recent_completed_for_learner(
        &self,
        learner_id: &str,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StoreError>;

    /// Completed sessions for a learner on one tier, newest first,
    /// excluding the named session
    fn recent_completed_on_tier(
        &self,
        learner_id: &str,
        tier_id: &str,
        exclude_session: &str,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StoreError>;

    /// Persist an attempt fact and bump the session's attempt count
    fn insert_attempt(&self, attempt: &Attempt) -> Result<(), StoreError>;

    /// All attempts of a session, oldest first
    fn attempts_for_session(&self, session_id: &str) -> Result<Vec<Attempt>, StoreError>;

    /// The session's most recent attempts, newest first
    fn recent_attempts(&self, session_id: &str, limit: u32) -> Result<Vec<Attempt>, StoreError>;

    fn learner(&self, id: &str) -> Result<Option<Learner>, StoreError>;

    /// Apply a completion atomically; see [`CompletionRecord`]
    fn complete_session(&self, record: &CompletionRecord) -> Result<(), StoreError>;

    /// Set the qualitative feedback text on a session
    ///
    /// This is the only write allowed on a completed session. It touches
    /// nothing but the feedback column.
    fn attach_feedback(&self, session_id: &str, feedback: &str) -> Result<(), StoreError>;

    /// XP grants for a learner, oldest first
    fn xp_log_for_learner(&self, learner_id: &str) -> Result<Vec<XpLogEntry>, StoreError>;
}
