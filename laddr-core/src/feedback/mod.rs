//! Asynchronous qualitative feedback
//!
//! Completion enqueues a job and returns immediately; a background worker
//! generates commentary and attaches it to the session later. Failures
//! are logged and never surfaced to the learner.

mod provider;
mod worker;

pub use provider::{FeedbackProvider, TemplateFeedbackProvider};
pub use worker::FeedbackWorker;

use tokio::sync::mpsc;

/// Everything the commentary provider needs to know about a finished run
#[derive(Debug, Clone)]
pub struct FeedbackJob {
    pub session_id: String,
    pub tier_name: String,
    pub score: f64,
    pub correct: u32,
    pub total: u32,
    pub flagged: bool,
}

/// Sending half of the feedback pipeline, held by the score aggregator
#[derive(Clone)]
pub struct FeedbackQueue {
    tx: mpsc::UnboundedSender<FeedbackJob>,
}

impl FeedbackQueue {
    /// Create the queue plus the receiver a [`FeedbackWorker`] drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FeedbackJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Fire-and-forget enqueue; a missing worker is logged, not an error
    pub fn enqueue(&self, job: FeedbackJob) {
        if self.tx.send(job).is_err() {
            tracing::warn!("Feedback worker is gone, dropping feedback job");
        }
    }
}
