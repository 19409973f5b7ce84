use async_trait::async_trait;
use thiserror::Error;

use crate::core::record::{Record, RecordFields, RecordId};

/// Custom error type for persistence operations
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum StoreError {
    /// No record with the given id exists
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// The storage backend failed
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type alias for persistence operations
pub type StoreResult<T> = Result<T, StoreError>;

/// RecordStore defines the port (interface) for record persistence
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Persist a new record and return it with its assigned id
    async fn create(&self, fields: RecordFields) -> StoreResult<Record>;

    async fn get(&self, id: RecordId) -> StoreResult<Record>;

    /// Records ordered by id, skipping `offset` and returning at most `limit`
    async fn list(&self, offset: usize, limit: usize) -> StoreResult<Vec<Record>>;

    async fn count(&self) -> StoreResult<u64>;

    /// Replace the stored contents of `record.id`
    async fn update(&self, record: Record) -> StoreResult<Record>;

    async fn delete(&self, id: RecordId) -> StoreResult<()>;
}
