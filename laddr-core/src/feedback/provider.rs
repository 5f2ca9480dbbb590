//! Commentary generation

use async_trait::async_trait;

use crate::error::FeedbackError;

use super::FeedbackJob;

/// Generates qualitative commentary for a completed session.
///
/// Implementations may call out to an external service; the worker
/// retries transient failures, so `generate` should fail fast rather
/// than retry internally.
#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    async fn generate(&self, job: &FeedbackJob) -> Result<String, FeedbackError>;
}

/// Template-based provider used when no external commentary service is
/// configured
pub struct TemplateFeedbackProvider;

#[async_trait]
impl FeedbackProvider for TemplateFeedbackProvider {
    async fn generate(&self, job: &FeedbackJob) -> Result<String, FeedbackError> {
        let summary = format!(
            "{} of {} correct on the {} tier",
            job.correct, job.total, job.tier_name
        );
        let text = if job.score >= 90.0 {
            format!("Outstanding work: {summary}. You are ready for a bigger challenge.")
        } else if job.score >= 60.0 {
            format!("Solid progress: {summary}. Review what you missed and keep climbing.")
        } else {
            format!("Keep at it: {summary}. Revisit this tier's material before moving on.")
        };
        Ok(text)
    }
}
