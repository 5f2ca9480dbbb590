//! laddr-core: Core library for the laddr adaptive assessment engine
//!
//! This crate provides the assessment and scoring components for laddr:
//!
//! - **Level gating** - [`LevelGate`] authorizes tier entry from prior results and opens sessions
//! - **Attempt recording** - [`AttemptRecorder`] grades answers and persists immutable attempt facts
//! - **Adaptive signals** - [`adaptive::detect`] advises difficulty changes from recent attempts
//! - **Integrity analysis** - [`integrity::evaluate`] flags suspicious completions without rejecting them
//! - **Scoring** - [`ScoreAggregator`] finalizes sessions into score, XP, rank score and status tier
//! - **Storage** - [`AssessmentStore`] and [`CatalogStore`] traits with SQLite and in-memory backends
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use laddr_core::{LevelGate, MemoryStore, ScoringPolicy};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let policy = Arc::new(ScoringPolicy::default());
//!
//!     let gate = LevelGate::new(store.clone(), store.clone(), policy);
//!     let session = gate.authorize_start("learner-1", "tier-1")?;
//!     println!("Session started: {}", session.id);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   start    ┌──────────────────┐   submit    ┌──────────────────┐
//! │ LevelGate  ├───────────►│   QuizSession    │◄────────────┤ AttemptRecorder  │
//! └────────────┘  creates   │  (IN_PROGRESS)   │   attempts  └────────┬─────────┘
//!                           └────────┬─────────┘                      │ consults
//!                                    │ complete                       ▼
//!                           ┌────────▼─────────┐             ┌──────────────────┐
//!                           │ ScoreAggregator  │             │ adaptive::detect │
//!                           │ integrity + XP   │             └──────────────────┘
//!                           └────────┬─────────┘
//!                                    │ enqueues
//!                           ┌────────▼─────────┐
//!                           │ FeedbackWorker   │  attaches commentary later
//!                           └──────────────────┘
//! ```

pub mod adaptive;
pub mod catalog;
pub mod error;
pub mod feedback;
pub mod gate;
pub mod integrity;
pub mod policy;
pub mod recorder;
pub mod scoring;
pub mod session;
pub mod store;

// Re-export key types for convenience
pub use adaptive::{AdaptiveSignal, AttemptSnapshot};
pub use catalog::{CatalogStore, Chapter, Difficulty, Question, QuestionOption, Tier, Topic};
pub use error::{CoreError, FeedbackError, GateError, RecorderError, ScoringError};
pub use feedback::{
    FeedbackJob, FeedbackProvider, FeedbackQueue, FeedbackWorker, TemplateFeedbackProvider,
};
pub use gate::LevelGate;
pub use integrity::IntegrityVerdict;
pub use policy::ScoringPolicy;
pub use recorder::{AttemptOutcome, AttemptRecorder};
pub use scoring::{CompletionSummary, ScoreAggregator};
pub use session::{Attempt, Learner, QuizSession, SessionStatus, XpLogEntry};
pub use store::{AssessmentStore, CompletionRecord, MemoryStore, SqliteStore, StoreError};
