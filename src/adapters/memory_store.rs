//! In-memory [`RecordStore`] backed by `scc::HashMap`.
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use scc::HashMap;

use crate::{
    core::record::{Record, RecordFields, RecordId},
    ports::record_store::{RecordStore, StoreError, StoreResult},
};

/// Ids start at 1 and are never reused, even after deletion.
pub struct MemoryRecordStore {
    records: HashMap<RecordId, Record>,
    next_id: AtomicI64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, fields: RecordFields) -> StoreResult<Record> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = Record::from_fields(id, fields);
        self.records
            .insert_async(id, record.clone())
            .await
            .map_err(|(id, _)| StoreError::Backend(format!("record id {id} already allocated")))?;
        Ok(record)
    }

    async fn get(&self, id: RecordId) -> StoreResult<Record> {
        self.records
            .get_async(&id)
            .await
            .map(|entry| entry.get().clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self, offset: usize, limit: usize) -> StoreResult<Vec<Record>> {
        let mut all = Vec::with_capacity(self.records.len());
        self.records.iter_sync(|_, record| {
            all.push(record.clone());
            true
        });
        all.sort_by_key(|record| record.id);
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.records.len() as u64)
    }

    async fn update(&self, record: Record) -> StoreResult<Record> {
        match self.records.get_async(&record.id).await {
            Some(mut entry) => {
                *entry.get_mut() = record.clone();
                Ok(record)
            }
            None => Err(StoreError::NotFound(record.id)),
        }
    }

    async fn delete(&self, id: RecordId) -> StoreResult<()> {
        self.records
            .remove_async(&id)
            .await
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}
