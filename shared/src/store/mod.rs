use async_trait::async_trait;

use crate::error::{Result, ServiceError};
use crate::models::Attributes;

// Expose the DynamoDB store module
pub mod dynamo;

/// Single-table key-value store addressed by (partition key, sort key).
///
/// All operations are best-effort single-item writes with last-write-wins
/// semantics; there are no transactions and no optimistic locking.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Gets one item, or None if absent.
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Attributes>>;

    /// Returns every item under `pk` whose attributes equal all entries in
    /// `filter` (an empty filter returns the whole partition).
    async fn query(&self, pk: &str, filter: &Attributes) -> Result<Vec<Attributes>>;

    /// Creates or overwrites one item.
    async fn create(&self, pk: &str, sk: &str, item: Attributes) -> Result<()>;

    /// Partially updates one item: non-null values are SET attribute by
    /// attribute, null values REMOVE the attribute.
    async fn update(&self, pk: &str, sk: &str, changes: Attributes) -> Result<()>;

    /// Deletes one item.
    async fn delete(&self, pk: &str, sk: &str) -> Result<()>;
}

/// `get` that treats absence as an error, for callers that require the row.
pub async fn get_required<S: KvStore + ?Sized>(
    store: &S,
    pk: &str,
    sk: &str,
) -> Result<Attributes> {
    store
        .get(pk, sk)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", pk, sk)))
}
