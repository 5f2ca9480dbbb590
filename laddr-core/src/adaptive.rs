//! Adaptive difficulty signal detection
//!
//! Pure inspection of a session's most recent attempts. The verdict is
//! advisory: callers decide whether to actually serve a harder or easier
//! question, and nothing here mutates session state.

use serde::{Deserialize, Serialize};

use crate::catalog::Difficulty;
use crate::policy::AdaptivePolicy;

/// Advisory difficulty adjustment for the next question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdaptiveSignal {
    /// Learner is cruising, serve harder questions
    #[serde(rename = "UPGRADE")]
    Escalate,
    /// Learner is struggling, serve easier questions
    #[serde(rename = "DOWNGRADE")]
    Deescalate,
    #[serde(rename = "NONE")]
    None,
}

impl AdaptiveSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Escalate => "UPGRADE",
            Self::Deescalate => "DOWNGRADE",
            Self::None => "NONE",
        }
    }
}

/// One attempt paired with its question's difficulty
#[derive(Debug, Clone)]
pub struct AttemptSnapshot {
    pub is_correct: bool,
    pub time_taken_seconds: u32,
    pub difficulty: Difficulty,
}

/// Inspect the most recent attempts (newest first) and advise on the next
/// question's difficulty.
///
/// Escalates when the last `escalate_window` attempts were all correct,
/// all hard, and each strictly faster than `escalate_max_seconds`.
/// De-escalates when the last `deescalate_window` attempts were all
/// incorrect at medium difficulty. Anything else is `None`.
pub fn detect(recent: &[AttemptSnapshot], policy: &AdaptivePolicy) -> AdaptiveSignal {
    if recent.len() >= policy.escalate_window
        && recent[..policy.escalate_window].iter().all(|a| {
            a.is_correct
                && a.difficulty == Difficulty::Hard
                && a.time_taken_seconds < policy.escalate_max_seconds
        })
    {
        return AdaptiveSignal::Escalate;
    }

    if recent.len() >= policy.deescalate_window
        && recent[..policy.deescalate_window]
            .iter()
            .all(|a| !a.is_correct && a.difficulty == Difficulty::Medium)
    {
        return AdaptiveSignal::Deescalate;
    }

    AdaptiveSignal::None
}
