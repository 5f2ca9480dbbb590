//! Session completion: scoring, rewards and status progression

use std::sync::Arc;

use chrono::Utc;

use crate::catalog::CatalogStore;
use crate::error::ScoringError;
use crate::feedback::{FeedbackJob, FeedbackQueue};
use crate::integrity;
use crate::policy::{RewardPolicy, ScoringPolicy};
use crate::store::{AssessmentStore, CompletionRecord, StoreError};

/// What the learner sees immediately after completing a session.
///
/// Qualitative feedback is not part of this; it arrives on the session
/// record later via the feedback worker.
#[derive(Debug, Clone)]
pub struct CompletionSummary {
    pub score: f64,
    pub xp_earned: u64,
    pub rank_score_earned: f64,
    pub new_status: String,
    pub next_level_unlock: Option<String>,
    pub flagged: bool,
}

/// Finalizes sessions: integrity check, score, XP, rank score and status
#[derive(Clone)]
pub struct ScoreAggregator {
    catalog: Arc<dyn CatalogStore>,
    store: Arc<dyn AssessmentStore>,
    policy: Arc<ScoringPolicy>,
    feedback: FeedbackQueue,
}

impl ScoreAggregator {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        store: Arc<dyn AssessmentStore>,
        policy: Arc<ScoringPolicy>,
        feedback: FeedbackQueue,
    ) -> Self {
        Self {
            catalog,
            store,
            policy,
            feedback,
        }
    }

    /// Complete a session: run the integrity rules, derive score and
    /// rewards from the recorded attempts, and apply every write in one
    /// store transaction. A session completes at most once; a second call
    /// fails with [`ScoringError::AlreadyCompleted`] and grants nothing.
    ///
    /// `tab_switches` is client telemetry, trusted as supplied.
    pub fn complete(
        &self,
        session_id: &str,
        tab_switches: u32,
    ) -> Result<CompletionSummary, ScoringError> {
        let session = self
            .store
            .session(session_id)?
            .ok_or_else(|| ScoringError::SessionNotFound(session_id.to_string()))?;
        if session.status.is_terminal() {
            return Err(ScoringError::AlreadyCompleted(session_id.to_string()));
        }

        let learner = self
            .store
            .learner(&session.learner_id)?
            .ok_or_else(|| ScoringError::LearnerNotFound(session.learner_id.clone()))?;
        let tier = self
            .catalog
            .tier(&session.tier_id)?
            .ok_or_else(|| ScoringError::TierNotFound(session.tier_id.clone()))?;
        let attempts = self.store.attempts_for_session(session_id)?;

        let total = attempts.len() as u32;
        let correct = attempts.iter().filter(|a| a.is_correct).count() as u32;
        let score = if total == 0 {
            0.0
        } else {
            100.0 * correct as f64 / total as f64
        };
        let time_spent: u32 = attempts.iter().map(|a| a.time_taken_seconds).sum();

        let prior = self.store.recent_completed_on_tier(
            &session.learner_id,
            &session.tier_id,
            session_id,
            self.policy.integrity.history_window,
        )?;
        let prior_scores: Vec<f64> = prior.iter().map(|s| s.score).collect();
        let verdict = integrity::evaluate(
            &attempts,
            tab_switches,
            score,
            &prior_scores,
            &self.policy.integrity,
        );
        if verdict.flagged {
            tracing::warn!(
                session = %session_id,
                learner = %session.learner_id,
                reasons = %verdict.reasons.join("; "),
                "Integrity rules flagged session"
            );
        }

        let rewards = &self.policy.rewards;
        let base_xp = correct as u64 * rewards.xp_per_correct;
        let bonus = speed_bonus(total, time_spent, rewards);
        let levels_completed = self.store.completed_session_count(&session.learner_id)? as u64 + 1;
        let rank_score_delta = score * rewards.score_weight
            + levels_completed as f64 * rewards.levels_weight
            + learner.streak as f64 * rewards.streak_weight
            + bonus as f64;

        let new_xp = learner.xp + base_xp;
        let new_status = status_tier_for_xp(new_xp, &self.policy);

        let record = CompletionRecord {
            session_id: session.id.clone(),
            learner_id: session.learner_id.clone(),
            score,
            time_spent_seconds: time_spent,
            tab_switches,
            flagged: verdict.flagged,
            flag_reason: verdict.reason_string(),
            ended_at: Utc::now(),
            xp_delta: base_xp,
            rank_score_delta,
            new_status_tier: new_status.clone(),
            xp_reason: format!("Completed {} tier", tier.name),
        };
        self.store.complete_session(&record).map_err(|e| match e {
            StoreError::AlreadyCompleted(id) => ScoringError::AlreadyCompleted(id),
            StoreError::SessionNotFound(id) => ScoringError::SessionNotFound(id),
            StoreError::LearnerNotFound(id) => ScoringError::LearnerNotFound(id),
            other => ScoringError::Store(other),
        })?;

        self.feedback.enqueue(FeedbackJob {
            session_id: session.id.clone(),
            tier_name: tier.name.clone(),
            score,
            correct,
            total,
            flagged: verdict.flagged,
        });

        tracing::info!(
            session = %session_id,
            learner = %session.learner_id,
            score,
            xp_earned = base_xp,
            status = %new_status,
            "Quiz session completed"
        );

        Ok(CompletionSummary {
            score,
            xp_earned: base_xp,
            rank_score_earned: rank_score_delta,
            new_status,
            next_level_unlock: next_unlock(&tier.name, score, &self.policy),
            flagged: verdict.flagged,
        })
    }
}

/// Rank score bonus for quick answering across the whole session
fn speed_bonus(total_attempts: u32, time_spent_seconds: u32, rewards: &RewardPolicy) -> u64 {
    if total_attempts == 0 {
        return 0;
    }
    let avg = time_spent_seconds as f64 / total_attempts as f64;
    if avg < rewards.fast_bonus_max_avg_seconds {
        rewards.fast_bonus
    } else if avg < rewards.steady_bonus_max_avg_seconds {
        rewards.steady_bonus
    } else {
        0
    }
}

/// Badge for a total XP amount, from the ordered policy bands
fn status_tier_for_xp(xp: u64, policy: &ScoringPolicy) -> String {
    for tier in &policy.status_tiers {
        match tier.max_xp {
            Some(max) if xp <= max => return tier.name.clone(),
            None => return tier.name.clone(),
            _ => {}
        }
    }
    policy
        .status_tiers
        .last()
        .map(|t| t.name.clone())
        .unwrap_or_default()
}

/// Advisory name of the tier this completion unlocks, if any.
///
/// The Diagnostic unlocks "Beginner" only on a strong result; other
/// tiers report the fixed successor chain Beginner, Intermediate,
/// Advance, Challenge once the standard threshold is met. The name is
/// for display; the level gate re-checks on the next start.
fn next_unlock(tier_name: &str, score: f64, policy: &ScoringPolicy) -> Option<String> {
    if tier_name == "Diagnostic" {
        if score >= policy.gating.diagnostic_pass_score {
            return Some("Beginner".to_string());
        }
        return None;
    }
    if score < policy.gating.standard_pass_score {
        return None;
    }
    match tier_name {
        "Beginner" => Some("Intermediate".to_string()),
        "Intermediate" => Some("Advance".to_string()),
        "Advance" => Some("Challenge".to_string()),
        _ => None,
    }
}
