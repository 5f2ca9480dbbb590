//! Background worker that attaches generated feedback to sessions

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::store::AssessmentStore;

use super::{FeedbackJob, FeedbackProvider};

/// Drains the feedback queue, generating commentary and writing it back.
///
/// The write only ever touches the session's feedback column, so it
/// cannot race destructively with the completion transaction.
pub struct FeedbackWorker {
    rx: mpsc::UnboundedReceiver<FeedbackJob>,
    provider: Arc<dyn FeedbackProvider>,
    store: Arc<dyn AssessmentStore>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl FeedbackWorker {
    pub fn new(
        rx: mpsc::UnboundedReceiver<FeedbackJob>,
        provider: Arc<dyn FeedbackProvider>,
        store: Arc<dyn AssessmentStore>,
    ) -> Self {
        Self {
            rx,
            provider,
            store,
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Override the retry schedule
    #[must_use]
    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_delay = retry_delay;
        self
    }

    /// Run until the queue closes or shutdown is signalled
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Feedback worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Feedback worker received shutdown signal");
                    break;
                }
                job = self.rx.recv() => {
                    match job {
                        Some(job) => self.process(job).await,
                        None => {
                            info!("Feedback queue closed, stopping worker");
                            break;
                        }
                    }
                }
            }
        }

        info!("Feedback worker stopped");
    }

    async fn process(&self, job: FeedbackJob) {
        for attempt in 1..=self.max_attempts {
            match self.provider.generate(&job).await {
                Ok(text) => {
                    match self.store.attach_feedback(&job.session_id, &text) {
                        Ok(()) => debug!(session = %job.session_id, "Feedback attached"),
                        Err(e) => {
                            error!(session = %job.session_id, error = %e, "Failed to store feedback");
                        }
                    }
                    return;
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        session = %job.session_id,
                        attempt,
                        error = %e,
                        "Feedback generation failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    error!(
                        session = %job.session_id,
                        error = %e,
                        "Giving up on feedback generation"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedbackError;
    use crate::feedback::FeedbackQueue;
    use crate::session::{Learner, QuizSession};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `fail_times` calls, then succeeds
    struct FlakyProvider {
        calls: AtomicU32,
        fail_times: u32,
    }

    impl FlakyProvider {
        fn new(fail_times: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_times,
            }
        }
    }

    #[async_trait]
    impl FeedbackProvider for FlakyProvider {
        async fn generate(&self, _job: &FeedbackJob) -> Result<String, FeedbackError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.fail_times {
                Err(FeedbackError::Generation(
                    "commentary service unavailable".to_string(),
                ))
            } else {
                Ok("Generated commentary".to_string())
            }
        }
    }

    fn store_with_session() -> (Arc<MemoryStore>, String) {
        let store = Arc::new(MemoryStore::new());
        store.insert_learner(Learner::new("lrn-1", "Ada"));
        let session = QuizSession::start("lrn-1", "tier-beg");
        let id = session.id.clone();
        store.insert_session(&session).unwrap();
        (store, id)
    }

    fn job_for(session_id: &str) -> FeedbackJob {
        FeedbackJob {
            session_id: session_id.to_string(),
            tier_name: "Beginner".to_string(),
            score: 70.0,
            correct: 7,
            total: 10,
            flagged: false,
        }
    }

    #[tokio::test]
    async fn test_worker_attaches_feedback() {
        let (store, session_id) = store_with_session();
        let (queue, rx) = FeedbackQueue::channel();
        let worker = FeedbackWorker::new(rx, Arc::new(FlakyProvider::new(0)), store.clone());

        queue.enqueue(job_for(&session_id));
        drop(queue);
        // Queue is closed, so run drains the job and returns
        worker.run(CancellationToken::new()).await;

        let session = store.session(&session_id).unwrap().unwrap();
        assert_eq!(session.feedback.as_deref(), Some("Generated commentary"));
    }

    #[tokio::test]
    async fn test_worker_retries_then_succeeds() {
        let (store, session_id) = store_with_session();
        let provider = Arc::new(FlakyProvider::new(2));
        let (queue, rx) = FeedbackQueue::channel();
        let worker = FeedbackWorker::new(rx, provider.clone(), store.clone())
            .with_retry(3, Duration::from_millis(1));

        queue.enqueue(job_for(&session_id));
        drop(queue);
        worker.run(CancellationToken::new()).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        let session = store.session(&session_id).unwrap().unwrap();
        assert_eq!(session.feedback.as_deref(), Some("Generated commentary"));
    }

    #[tokio::test]
    async fn test_worker_gives_up_after_max_attempts() {
        let (store, session_id) = store_with_session();
        let provider = Arc::new(FlakyProvider::new(u32::MAX));
        let (queue, rx) = FeedbackQueue::channel();
        let worker = FeedbackWorker::new(rx, provider.clone(), store.clone())
            .with_retry(2, Duration::from_millis(1));

        queue.enqueue(job_for(&session_id));
        drop(queue);
        worker.run(CancellationToken::new()).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        let session = store.session(&session_id).unwrap().unwrap();
        assert_eq!(session.feedback, None);
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown_signal() {
        let (store, _session_id) = store_with_session();
        let (_queue, rx) = FeedbackQueue::channel();
        let worker = FeedbackWorker::new(rx, Arc::new(FlakyProvider::new(0)), store);

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker.run(shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker should stop promptly")
            .unwrap();
    }
}
