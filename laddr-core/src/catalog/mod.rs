//! Content catalog: topics, chapters, tiers and questions

mod store;
mod types;

pub use store::CatalogStore;
pub use types::{Chapter, Difficulty, Question, QuestionOption, Tier, Topic};
