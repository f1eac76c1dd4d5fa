use crate::domain_model::*;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store call timed out")]
    Timeout,
    #[error("backend error: {0}")]
    Backend(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait::async_trait]
pub trait RevocationStore: Send + Sync {
    /// Write the record under `id`; it passively expires after `ttl`.
    async fn save(
        &self,
        id: &RecordId,
        record: &RefreshRecord,
        ttl: Duration,
    ) -> Result<(), StoreError>;
    async fn get(&self, id: &RecordId) -> Result<Option<RefreshRecord>, StoreError>;
    /// Remove the record. `Ok(false)` if it was already gone.
    async fn delete(&self, id: &RecordId) -> Result<bool, StoreError>;
}
