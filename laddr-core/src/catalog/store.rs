//! Read access to the content catalog

use crate::store::StoreError;

use super::types::{Chapter, Question, Tier, Topic};

/// Read-only view of the content catalog
///
/// The content collaborator owns these rows; the engine only reads them.
/// Seeding happens through inherent methods on the concrete stores.
pub trait CatalogStore: Send + Sync {
    fn topic(&self, id: &str) -> Result<Option<Topic>, StoreError>;
    fn chapter(&self, id: &str) -> Result<Option<Chapter>, StoreError>;
    fn tier(&self, id: &str) -> Result<Option<Tier>, StoreError>;

    /// Tiers of a chapter sorted by `order_index` ascending
    fn tiers_in_chapter(&self, chapter_id: &str) -> Result<Vec<Tier>, StoreError>;

    fn question(&self, id: &str) -> Result<Option<Question>, StoreError>;
    fn questions_in_tier(&self, tier_id: &str) -> Result<Vec<Question>, StoreError>;
}
