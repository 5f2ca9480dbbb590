//! Completion-time integrity analysis
//!
//! Flags suspicious sessions without rejecting them. Flagging is
//! advisory: scores and XP are granted either way, and the flag plus its
//! reasons are stored for later review.

use crate::policy::IntegrityPolicy;
use crate::session::Attempt;

/// Outcome of the integrity rules for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityVerdict {
    pub flagged: bool,
    /// One entry per triggered rule, in rule order
    pub reasons: Vec<String>,
}

impl IntegrityVerdict {
    /// All reasons joined for the session record, `None` when clean
    pub fn reason_string(&self) -> Option<String> {
        if self.reasons.is_empty() {
            None
        } else {
            Some(self.reasons.join("; "))
        }
    }
}

/// Evaluate every integrity rule over the session's attempts, client
/// telemetry and the learner's recent history on the same tier.
///
/// Rules are independent: all of them run and every triggered rule
/// contributes a reason. `prior_tier_scores` holds the scores of the
/// learner's most recent completed sessions on this tier, excluding the
/// session under evaluation.
pub fn evaluate(
    attempts: &[Attempt],
    tab_switches: u32,
    final_score: f64,
    prior_tier_scores: &[f64],
    policy: &IntegrityPolicy,
) -> IntegrityVerdict {
    let mut reasons = Vec::new();

    let total_seconds: u32 = attempts.iter().map(|a| a.time_taken_seconds).sum();

    if total_seconds < policy.fast_completion_seconds
        && attempts.len() >= policy.fast_completion_min_attempts
    {
        reasons.push("Fast completion detected".to_string());
    }

    if !attempts.is_empty() {
        let avg_seconds = total_seconds as f64 / attempts.len() as f64;
        if avg_seconds < policy.suspicious_avg_seconds {
            reasons.push("Suspicious answer pattern".to_string());
        }
    }

    if tab_switches >= policy.tab_switch_limit {
        reasons.push("Excessive tab switching".to_string());
    }

    // Perfect run after repeated poor results on the same tier
    if final_score >= 100.0 {
        let poor_runs = prior_tier_scores
            .iter()
            .filter(|score| **score < policy.low_score_threshold)
            .count();
        if poor_runs >= policy.low_score_count {
            reasons.push("Suspicious score improvement".to_string());
        }
    }

    IntegrityVerdict {
        flagged: !reasons.is_empty(),
        reasons,
    }
}
