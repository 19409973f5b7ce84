//! Record domain service: field validation, persistence calls and the
//! per-operation domain counters.
use std::sync::Arc;

use crate::{
    core::{
        error::ServiceError,
        record::{Page, Record, RecordDraft, RecordFields, RecordId},
    },
    metrics,
    ports::record_store::{RecordStore, StoreError},
};

#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn RecordStore>,
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::not_found(format!("record {id} not found")),
            StoreError::Backend(message) => ServiceError::internal(message),
        }
    }
}

fn validated(draft: RecordDraft) -> Result<RecordFields, ServiceError> {
    draft.validate().map_err(|violations| {
        let message = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        ServiceError::InvalidArgument(message)
    })
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, draft: RecordDraft) -> Result<Record, ServiceError> {
        let fields = validated(draft)?;
        let record = self.store.create(fields).await?;
        metrics::increment_record_creations();
        tracing::info!(record_id = record.id, "record created");
        Ok(record)
    }

    pub async fn get(&self, id: RecordId) -> Result<Record, ServiceError> {
        let record = self.store.get(id).await?;
        metrics::increment_record_retrievals();
        Ok(record)
    }

    /// One page of records plus the total number of stored records.
    pub async fn list(&self, page: Page) -> Result<(Vec<Record>, u64), ServiceError> {
        let records = self.store.list(page.offset(), page.limit()).await?;
        let total = self.store.count().await?;
        metrics::increment_record_retrievals();
        tracing::debug!(
            page = page.number,
            size = page.size,
            returned = records.len(),
            total,
            "records listed"
        );
        Ok((records, total))
    }

    pub async fn update(&self, id: RecordId, draft: RecordDraft) -> Result<Record, ServiceError> {
        let fields = validated(draft)?;
        let record = self.store.update(Record::from_fields(id, fields)).await?;
        metrics::increment_record_updates();
        tracing::info!(record_id = id, "record updated");
        Ok(record)
    }

    pub async fn delete(&self, id: RecordId) -> Result<(), ServiceError> {
        self.store.delete(id).await?;
        metrics::increment_record_deletions();
        tracing::info!(record_id = id, "record deleted");
        Ok(())
    }
}
