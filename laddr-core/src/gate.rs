//! Tier entry authorization

use std::sync::Arc;

use crate::catalog::{CatalogStore, Tier};
use crate::error::GateError;
use crate::policy::ScoringPolicy;
use crate::session::QuizSession;
use crate::store::AssessmentStore;

/// Decides whether a learner may enter a tier and opens the session
#[derive(Clone)]
pub struct LevelGate {
    catalog: Arc<dyn CatalogStore>,
    store: Arc<dyn AssessmentStore>,
    policy: Arc<ScoringPolicy>,
}

impl LevelGate {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        store: Arc<dyn AssessmentStore>,
        policy: Arc<ScoringPolicy>,
    ) -> Self {
        Self {
            catalog,
            store,
            policy,
        }
    }

    /// Authorize `learner_id` to start `tier_id` and create the session.
    ///
    /// The first tier of a chapter and any tier named "Diagnostic" are
    /// always open. Every other tier requires the learner's best completed
    /// score on the immediately preceding tier to reach the policy
    /// threshold, which is higher when that predecessor is the Diagnostic.
    ///
    /// The check and the session insert are deliberately not one
    /// transaction: two concurrent calls can both pass and open two
    /// sessions. Sessions are per-attempt, so this is harmless.
    pub fn authorize_start(
        &self,
        learner_id: &str,
        tier_id: &str,
    ) -> Result<QuizSession, GateError> {
        if self.store.learner(learner_id)?.is_none() {
            return Err(GateError::LearnerNotFound(learner_id.to_string()));
        }

        let tier = self
            .catalog
            .tier(tier_id)?
            .ok_or_else(|| GateError::TierNotFound(tier_id.to_string()))?;

        if let Some(prerequisite) = self.prerequisite_for(&tier)? {
            let required_score = if prerequisite.is_diagnostic() {
                self.policy.gating.diagnostic_pass_score
            } else {
                self.policy.gating.standard_pass_score
            };
            let best = self
                .store
                .best_completed_score(learner_id, &prerequisite.id)?;
            if !best.is_some_and(|score| score >= required_score) {
                tracing::debug!(
                    learner = %learner_id,
                    tier = %tier.name,
                    prerequisite = %prerequisite.name,
                    required_score,
                    "Tier locked"
                );
                return Err(GateError::Locked {
                    required_score,
                    prerequisite: prerequisite.name,
                });
            }
        }

        let session = QuizSession::start(learner_id, tier_id);
        self.store.insert_session(&session)?;
        tracing::info!(
            learner = %learner_id,
            tier = %tier.name,
            session = %session.id,
            "Quiz session started"
        );
        Ok(session)
    }

    /// The tier whose score gates entry, `None` when entry is free
    fn prerequisite_for(&self, tier: &Tier) -> Result<Option<Tier>, GateError> {
        if tier.is_diagnostic() {
            return Ok(None);
        }
        let siblings = self.catalog.tiers_in_chapter(&tier.chapter_id)?;
        match siblings.iter().position(|t| t.id == tier.id) {
            Some(position) if position > 0 => Ok(Some(siblings[position - 1].clone())),
            // First by order, or not listed under its chapter at all
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Learner, SessionStatus};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (id, name, order) in [
            ("tier-diag", "Diagnostic", 0u32),
            ("tier-beg", "Beginner", 1),
            ("tier-int", "Intermediate", 2),
            ("tier-adv", "Advance", 3),
            ("tier-cha", "Challenge", 4),
        ] {
            store.insert_tier(Tier {
                id: id.into(),
                chapter_id: "ch-1".into(),
                name: name.into(),
                order_index: order,
            });
        }
        store.insert_learner(Learner::new("lrn-1", "Ada"));
        store
    }

    fn gate(store: &Arc<MemoryStore>) -> LevelGate {
        LevelGate::new(
            store.clone(),
            store.clone(),
            Arc::new(ScoringPolicy::default()),
        )
    }

    fn complete_with_score(store: &MemoryStore, learner: &str, tier: &str, score: f64) {
        let mut session = QuizSession::start(learner, tier);
        session.status = SessionStatus::Completed;
        session.score = score;
        session.ended_at = Some(Utc::now());
        store.insert_session(&session).unwrap();
    }

    #[test]
    fn test_diagnostic_tier_always_open() {
        let store = seeded_store();
        let session = gate(&store).authorize_start("lrn-1", "tier-diag").unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(session.tier_id, "tier-diag");
    }

    #[test]
    fn test_first_tier_by_order_open_without_diagnostic() {
        let store = Arc::new(MemoryStore::new());
        store.insert_tier(Tier {
            id: "tier-beg".into(),
            chapter_id: "ch-2".into(),
            name: "Beginner".into(),
            order_index: 0,
        });
        store.insert_learner(Learner::new("lrn-1", "Ada"));

        assert!(gate(&store).authorize_start("lrn-1", "tier-beg").is_ok());
    }

    #[test]
    fn test_locked_without_prior_completion() {
        let store = seeded_store();
        let err = gate(&store)
            .authorize_start("lrn-1", "tier-int")
            .unwrap_err();
        match err {
            GateError::Locked {
                required_score,
                prerequisite,
            } => {
                assert_eq!(required_score, 60.0);
                assert_eq!(prerequisite, "Beginner");
            }
            other => panic!("expected Locked, got {other:?}"),
        }
    }

    #[test]
    fn test_standard_threshold_boundary() {
        let store = seeded_store();
        complete_with_score(&store, "lrn-1", "tier-beg", 59.9);
        assert!(matches!(
            gate(&store).authorize_start("lrn-1", "tier-int"),
            Err(GateError::Locked { .. })
        ));

        let store = seeded_store();
        complete_with_score(&store, "lrn-1", "tier-beg", 60.0);
        assert!(gate(&store).authorize_start("lrn-1", "tier-int").is_ok());
    }

    #[test]
    fn test_diagnostic_prerequisite_requires_higher_score() {
        let store = seeded_store();
        complete_with_score(&store, "lrn-1", "tier-diag", 79.0);
        let err = gate(&store)
            .authorize_start("lrn-1", "tier-beg")
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::Locked {
                required_score,
                ..
            } if required_score == 80.0
        ));

        let store = seeded_store();
        complete_with_score(&store, "lrn-1", "tier-diag", 80.0);
        assert!(gate(&store).authorize_start("lrn-1", "tier-beg").is_ok());
    }

    #[test]
    fn test_best_score_across_sessions_counts() {
        let store = seeded_store();
        complete_with_score(&store, "lrn-1", "tier-beg", 40.0);
        complete_with_score(&store, "lrn-1", "tier-beg", 65.0);
        complete_with_score(&store, "lrn-1", "tier-beg", 50.0);

        assert!(gate(&store).authorize_start("lrn-1", "tier-int").is_ok());
    }

    #[test]
    fn test_in_progress_sessions_do_not_unlock() {
        let store = seeded_store();
        let mut open = QuizSession::start("lrn-1", "tier-beg");
        open.score = 95.0;
        store.insert_session(&open).unwrap();

        assert!(matches!(
            gate(&store).authorize_start("lrn-1", "tier-int"),
            Err(GateError::Locked { .. })
        ));
    }

    #[test]
    fn test_session_persisted_on_success() {
        let store = seeded_store();
        let session = gate(&store).authorize_start("lrn-1", "tier-diag").unwrap();

        let stored = store.session(&session.id).unwrap().unwrap();
        assert_eq!(stored.learner_id, "lrn-1");
        assert_eq!(stored.status, SessionStatus::InProgress);
        assert_eq!(stored.score, 0.0);
        assert_eq!(stored.attempt_count, 0);
    }

    #[test]
    fn test_unknown_tier_rejected() {
        let store = seeded_store();
        assert!(matches!(
            gate(&store).authorize_start("lrn-1", "tier-???"),
            Err(GateError::TierNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_learner_rejected() {
        let store = seeded_store();
        assert!(matches!(
            gate(&store).authorize_start("ghost", "tier-diag"),
            Err(GateError::LearnerNotFound(_))
        ));
    }
}
