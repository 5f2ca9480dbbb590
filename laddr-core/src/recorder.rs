//! Attempt recording
//!
//! Each submitted answer becomes an immutable attempt row. Recording is
//! intentionally not idempotent: a duplicate submission for the same
//! question creates a second attempt, and both count toward the score.

use std::sync::Arc;

use crate::adaptive::{self, AdaptiveSignal, AttemptSnapshot};
use crate::catalog::CatalogStore;
use crate::error::RecorderError;
use crate::policy::ScoringPolicy;
use crate::session::Attempt;
use crate::store::AssessmentStore;

/// What the learner is told right after answering
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub is_correct: bool,
    pub correct_option_id: String,
    pub feedback: String,
    pub signal: AdaptiveSignal,
}

/// Records answer attempts against a live session
#[derive(Clone)]
pub struct AttemptRecorder {
    catalog: Arc<dyn CatalogStore>,
    store: Arc<dyn AssessmentStore>,
    policy: Arc<ScoringPolicy>,
}

impl AttemptRecorder {
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

    /// Grade one answer, persist the attempt and return immediate
    /// feedback plus the adaptive difficulty signal.
    ///
    /// Completed sessions reject further attempts.
    pub fn record(
        &self,
        session_id: &str,
        question_id: &str,
        selected_option_id: &str,
        time_taken_seconds: u32,
    ) -> Result<AttemptOutcome, RecorderError> {
        let session = self
            .store
            .session(session_id)?
            .ok_or_else(|| RecorderError::SessionNotFound(session_id.to_string()))?;
        if session.status.is_terminal() {
            return Err(RecorderError::SessionCompleted(session_id.to_string()));
        }

        let question = self
            .catalog
            .question(question_id)?
            .ok_or_else(|| RecorderError::QuestionNotFound(question_id.to_string()))?;

        let is_correct = selected_option_id == question.correct_option_id;
        let attempt = Attempt::new(
            session_id,
            question_id,
            selected_option_id,
            is_correct,
            time_taken_seconds,
        );
        self.store.insert_attempt(&attempt)?;

        let signal = self.detect_signal(session_id)?;
        tracing::debug!(
            session = %session_id,
            question = %question_id,
            is_correct,
            signal = %signal.as_str(),
            "Attempt recorded"
        );

        Ok(AttemptOutcome {
            is_correct,
            correct_option_id: question.correct_option_id.clone(),
            feedback: question.feedback_for(is_correct),
            signal,
        })
    }

    /// Run the adaptive detector over the session's freshest attempts
    fn detect_signal(&self, session_id: &str) -> Result<AdaptiveSignal, RecorderError> {
        let window = self.policy.adaptive.window() as u32;
        let recent = self.store.recent_attempts(session_id, window)?;

        let mut snapshots = Vec::with_capacity(recent.len());
        for attempt in &recent {
            // Attempts whose question was since unpublished carry no
            // difficulty and are skipped
            let Some(question) = self.catalog.question(&attempt.question_id)? else {
                continue;
            };
            snapshots.push(AttemptSnapshot {
                is_correct: attempt.is_correct,
                time_taken_seconds: attempt.time_taken_seconds,
                difficulty: question.difficulty,
            });
        }

        Ok(adaptive::detect(&snapshots, &self.policy.adaptive))
    }
}
