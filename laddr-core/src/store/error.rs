//! Store error types

use thiserror::Error;

/// Errors for assessment storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Learner not found: {0}")]
    LearnerNotFound(String),

    #[error("Session already completed: {0}")]
    AlreadyCompleted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::SessionNotFound("sess-123".into());
        assert_eq!(err.to_string(), "Session not found: sess-123");
    }

    #[test]
    fn test_already_completed_display() {
        let err = StoreError::AlreadyCompleted("sess-9".into());
        assert!(err.to_string().contains("already completed"));
        assert!(err.to_string().contains("sess-9"));
    }

    #[test]
    fn test_migration_error_display() {
        let err = StoreError::Migration("v001 failed".into());
        assert!(err.to_string().contains("v001 failed"));
    }
}
