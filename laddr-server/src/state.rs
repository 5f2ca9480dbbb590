//! Shared application state for the laddr server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use laddr_core::{
    AssessmentStore, AttemptRecorder, CatalogStore, FeedbackQueue, LevelGate, ScoreAggregator,
    ScoringPolicy,
};

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Gate deciding whether a learner may enter a tier
    pub gate: LevelGate,
    /// Grades submitted answers and records attempt facts
    pub recorder: AttemptRecorder,
    /// Finalizes sessions into scores, rewards and status changes
    pub aggregator: ScoreAggregator,
    /// Session and learner storage, read directly by the report handlers
    pub store: Arc<dyn AssessmentStore>,
    /// Content catalog, read directly by the session detail handler
    pub catalog: Arc<dyn CatalogStore>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire the engine components around one catalog, store and policy.
    ///
    /// The feedback queue's receiving half belongs to a [`laddr_core::FeedbackWorker`]
    /// the caller runs separately; completion works fine without one, the
    /// enqueued jobs are just dropped.
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        store: Arc<dyn AssessmentStore>,
        policy: ScoringPolicy,
        feedback: FeedbackQueue,
    ) -> Self {
        let policy = Arc::new(policy);
        Self {
            gate: LevelGate::new(catalog.clone(), store.clone(), policy.clone()),
            recorder: AttemptRecorder::new(catalog.clone(), store.clone(), policy.clone()),
            aggregator: ScoreAggregator::new(catalog.clone(), store.clone(), policy, feedback),
            store,
            catalog,
            started_at: Utc::now(),
        }
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laddr_core::MemoryStore;

    #[test]
    fn test_app_state_new() {
        let store = Arc::new(MemoryStore::new());
        let (queue, _rx) = FeedbackQueue::channel();
        let state = AppState::new(store.clone(), store, ScoringPolicy::default(), queue);
        assert!(state.uptime_seconds() >= 0);
    }

    #[test]
    fn test_app_state_components_share_the_store() {
        let store = Arc::new(MemoryStore::new());
        let (queue, _rx) = FeedbackQueue::channel();
        let state = AppState::new(store.clone(), store, ScoringPolicy::default(), queue);

        // The gate and the direct store handle see the same backing store
        let err = state.gate.authorize_start("nobody", "tier-1").unwrap_err();
        assert!(err.to_string().contains("Learner not found"));
        assert!(state.store.session("missing").unwrap().is_none());
    }
}
