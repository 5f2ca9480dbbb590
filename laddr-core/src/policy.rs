//! Tunable scoring and gating policy
//!
//! Every numeric rule the engine applies lives here so deployments can
//! adjust thresholds from a TOML file without code changes. The defaults
//! are the production values.

use serde::{Deserialize, Serialize};

/// Full policy injected into every engine component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Tier prerequisite thresholds
    #[serde(default)]
    pub gating: GatingPolicy,

    /// In-session difficulty signal thresholds
    #[serde(default)]
    pub adaptive: AdaptivePolicy,

    /// Completion-time integrity rules
    #[serde(default)]
    pub integrity: IntegrityPolicy,

    /// XP and rank score formula coefficients
    #[serde(default)]
    pub rewards: RewardPolicy,

    /// Status tiers ordered by XP ceiling, last entry unbounded
    #[serde(default = "default_status_tiers")]
    pub status_tiers: Vec<StatusTier>,
}

impl ScoringPolicy {
    /// Parse a policy from TOML, falling back to defaults for omitted sections
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            gating: GatingPolicy::default(),
            adaptive: AdaptivePolicy::default(),
            integrity: IntegrityPolicy::default(),
            rewards: RewardPolicy::default(),
            status_tiers: default_status_tiers(),
        }
    }
}

/// Minimum score on the prerequisite tier before a tier unlocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatingPolicy {
    /// Required score when the prerequisite is the Diagnostic tier
    #[serde(default = "default_diagnostic_pass_score")]
    pub diagnostic_pass_score: f64,

    /// Required score for every other prerequisite
    #[serde(default = "default_standard_pass_score")]
    pub standard_pass_score: f64,
}

impl Default for GatingPolicy {
    fn default() -> Self {
        Self {
            diagnostic_pass_score: default_diagnostic_pass_score(),
            standard_pass_score: default_standard_pass_score(),
        }
    }
}

/// Windows and timing bounds for the adaptive signal detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptivePolicy {
    /// Recent attempts that must all be fast, correct and hard to escalate
    #[serde(default = "default_escalate_window")]
    pub escalate_window: usize,

    /// Each escalating attempt must take strictly fewer seconds than this
    #[serde(default = "default_escalate_max_seconds")]
    pub escalate_max_seconds: u32,

    /// Recent attempts that must all be incorrect and medium to de-escalate
    #[serde(default = "default_deescalate_window")]
    pub deescalate_window: usize,
}

impl AdaptivePolicy {
    /// How many recent attempts the detector needs to see
    pub fn window(&self) -> usize {
        self.escalate_window.max(self.deescalate_window)
    }
}

impl Default for AdaptivePolicy {
    fn default() -> Self {
        Self {
            escalate_window: default_escalate_window(),
            escalate_max_seconds: default_escalate_max_seconds(),
            deescalate_window: default_deescalate_window(),
        }
    }
}

/// Thresholds for the completion-time integrity rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityPolicy {
    /// Total session seconds below which a long session is suspicious
    #[serde(default = "default_fast_completion_seconds")]
    pub fast_completion_seconds: u32,

    /// Minimum attempts before the fast-completion rule applies
    #[serde(default = "default_fast_completion_min_attempts")]
    pub fast_completion_min_attempts: usize,

    /// Average seconds per attempt below which answers look automated
    #[serde(default = "default_suspicious_avg_seconds")]
    pub suspicious_avg_seconds: f64,

    /// Tab switches at or above this count flag the session
    #[serde(default = "default_tab_switch_limit")]
    pub tab_switch_limit: u32,

    /// How many prior completions on the tier to inspect
    #[serde(default = "default_history_window")]
    pub history_window: u32,

    /// Prior scores below this count as poor history
    #[serde(default = "default_low_score_threshold")]
    pub low_score_threshold: f64,

    /// Poor prior scores needed to make a perfect run suspicious
    #[serde(default = "default_low_score_count")]
    pub low_score_count: usize,
}

impl Default for IntegrityPolicy {
    fn default() -> Self {
        Self {
            fast_completion_seconds: default_fast_completion_seconds(),
            fast_completion_min_attempts: default_fast_completion_min_attempts(),
            suspicious_avg_seconds: default_suspicious_avg_seconds(),
            tab_switch_limit: default_tab_switch_limit(),
            history_window: default_history_window(),
            low_score_threshold: default_low_score_threshold(),
            low_score_count: default_low_score_count(),
        }
    }
}

/// XP grants and rank score formula coefficients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardPolicy {
    /// XP granted per correct answer
    #[serde(default = "default_xp_per_correct")]
    pub xp_per_correct: u64,

    /// Average seconds per attempt below which the fast bonus applies
    #[serde(default = "default_fast_bonus_max_avg_seconds")]
    pub fast_bonus_max_avg_seconds: f64,

    /// Rank score bonus for a fast session
    #[serde(default = "default_fast_bonus")]
    pub fast_bonus: u64,

    /// Average seconds per attempt below which the steady bonus applies
    #[serde(default = "default_steady_bonus_max_avg_seconds")]
    pub steady_bonus_max_avg_seconds: f64,

    /// Rank score bonus for a steady session
    #[serde(default = "default_steady_bonus")]
    pub steady_bonus: u64,

    /// Weight of the session score in the rank score delta
    #[serde(default = "default_score_weight")]
    pub score_weight: f64,

    /// Weight of total completed levels in the rank score delta
    #[serde(default = "default_levels_weight")]
    pub levels_weight: f64,

    /// Weight of the learner's streak in the rank score delta
    #[serde(default = "default_streak_weight")]
    pub streak_weight: f64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            xp_per_correct: default_xp_per_correct(),
            fast_bonus_max_avg_seconds: default_fast_bonus_max_avg_seconds(),
            fast_bonus: default_fast_bonus(),
            steady_bonus_max_avg_seconds: default_steady_bonus_max_avg_seconds(),
            steady_bonus: default_steady_bonus(),
            score_weight: default_score_weight(),
            levels_weight: default_levels_weight(),
            streak_weight: default_streak_weight(),
        }
    }
}

/// One status badge band, promoted past when XP exceeds `max_xp`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTier {
    /// Badge name shown to the learner
    pub name: String,
    /// Inclusive XP ceiling for this badge; `None` for the top badge
    pub max_xp: Option<u64>,
}

fn default_diagnostic_pass_score() -> f64 {
    80.0
}

fn default_standard_pass_score() -> f64 {
    60.0
}

fn default_escalate_window() -> usize {
    3
}

fn default_escalate_max_seconds() -> u32 {
    25
}

fn default_deescalate_window() -> usize {
    2
}

fn default_fast_completion_seconds() -> u32 {
    30
}

fn default_fast_completion_min_attempts() -> usize {
    10
}

fn default_suspicious_avg_seconds() -> f64 {
    2.0
}

fn default_tab_switch_limit() -> u32 {
    3
}

fn default_history_window() -> u32 {
    3
}

fn default_low_score_threshold() -> f64 {
    60.0
}

fn default_low_score_count() -> usize {
    2
}

fn default_xp_per_correct() -> u64 {
    10
}

fn default_fast_bonus_max_avg_seconds() -> f64 {
    30.0
}

fn default_fast_bonus() -> u64 {
    50
}

fn default_steady_bonus_max_avg_seconds() -> f64 {
    60.0
}

fn default_steady_bonus() -> u64 {
    20
}

fn default_score_weight() -> f64 {
    0.5
}

fn default_levels_weight() -> f64 {
    10.0
}

fn default_streak_weight() -> f64 {
    2.0
}

fn default_status_tiers() -> Vec<StatusTier> {
    vec![
        StatusTier {
            name: "Learner".to_string(),
            max_xp: Some(500),
        },
        StatusTier {
            name: "Smart Scholar".to_string(),
            max_xp: Some(1500),
        },
        StatusTier {
            name: "Gold Scholar".to_string(),
            max_xp: Some(3000),
        },
        StatusTier {
            name: "Elite Scholar".to_string(),
            max_xp: None,
        },
    ]
}
