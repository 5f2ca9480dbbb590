//! Persistence for the content catalog and assessment state

mod error;
mod memory;
mod migrations;
mod sqlite;
mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AssessmentStore, CompletionRecord};
