//! Error types for laddr-core

use thiserror::Error;

use crate::store::StoreError;

/// Top-level error type for laddr-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Gate error: {0}")]
    Gate(#[from] GateError),

    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),

    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Feedback error: {0}")]
    Feedback(#[from] FeedbackError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the level gate
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Learner not found: {0}")]
    LearnerNotFound(String),

    #[error("Tier not found: {0}")]
    TierNotFound(String),

    #[error("Score at least {required_score} in {prerequisite} to unlock this tier")]
    Locked {
        required_score: f64,
        prerequisite: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the attempt recorder
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Question not found: {0}")]
    QuestionNotFound(String),

    #[error("Session already completed: {0}")]
    SessionCompleted(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the score aggregator
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session already completed: {0}")]
    AlreadyCompleted(String),

    #[error("Learner not found: {0}")]
    LearnerNotFound(String),

    #[error("Tier not found: {0}")]
    TierNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from qualitative feedback generation
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("Feedback generation failed: {0}")]
    Generation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test GateError Display implementations
    #[test]
    fn gate_error_locked_displays_threshold_and_prerequisite() {
        let error = GateError::Locked {
            required_score: 60.0,
            prerequisite: "Beginner".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("60"));
        assert!(msg.contains("Beginner"));
    }

    #[test]
    fn gate_error_tier_not_found_displays_correctly() {
        let error = GateError::TierNotFound("tier-42".to_string());
        assert!(error.to_string().contains("Tier not found"));
        assert!(error.to_string().contains("tier-42"));
    }

    // Test RecorderError Display implementations
    #[test]
    fn recorder_error_question_not_found_displays_correctly() {
        let error = RecorderError::QuestionNotFound("q-9".to_string());
        assert!(error.to_string().contains("Question not found"));
        assert!(error.to_string().contains("q-9"));
    }

    #[test]
    fn recorder_error_session_completed_displays_correctly() {
        let error = RecorderError::SessionCompleted("sess-1".to_string());
        assert!(error.to_string().contains("already completed"));
    }

    // Test ScoringError Display implementations
    #[test]
    fn scoring_error_already_completed_displays_correctly() {
        let error = ScoringError::AlreadyCompleted("sess-1".to_string());
        assert!(error.to_string().contains("already completed"));
        assert!(error.to_string().contains("sess-1"));
    }

    #[test]
    fn scoring_error_learner_not_found_displays_correctly() {
        let error = ScoringError::LearnerNotFound("lrn-7".to_string());
        assert!(error.to_string().contains("Learner not found"));
    }

    // Test From conversions
    #[test]
    fn core_error_converts_from_gate_error() {
        let gate_error = GateError::TierNotFound("t".to_string());
        let core_error: CoreError = gate_error.into();
        assert!(matches!(core_error, CoreError::Gate(_)));
    }

    #[test]
    fn core_error_converts_from_scoring_error() {
        let scoring_error = ScoringError::SessionNotFound("s".to_string());
        let core_error: CoreError = scoring_error.into();
        assert!(matches!(core_error, CoreError::Scoring(_)));
    }

    #[test]
    fn gate_error_converts_from_store_error() {
        let store_error = StoreError::SessionNotFound("s".to_string());
        let gate_error: GateError = store_error.into();
        assert!(matches!(gate_error, GateError::Store(_)));
    }

    #[test]
    fn feedback_error_generation_displays_correctly() {
        let error = FeedbackError::Generation("provider offline".to_string());
        assert!(error.to_string().contains("provider offline"));
    }
}
