//! The one [`RecordOperations`] implementation behind both protocols.
//!
//! Converts wire messages to domain values, runs the domain service under
//! the request's cancellation token and deadline, and converts results back.
use async_trait::async_trait;
use prost_types::Timestamp;

use crate::{
    core::{
        context::RequestContext,
        error::ServiceError,
        record::{self, Page, RecordDraft},
        service::RecordService,
    },
    ports::record_operations::RecordOperations,
    proto,
};

pub struct RecordHandler {
    service: RecordService,
}

impl RecordHandler {
    pub fn new(service: RecordService) -> Self {
        Self { service }
    }
}

fn to_proto(record: record::Record) -> proto::Record {
    proto::Record {
        id: record.id,
        title: record.title,
        director: record.director,
        release_date: Some(record::to_timestamp(record.release_date)),
        genre: record.genre,
        rating: record.rating,
    }
}

fn draft(
    title: String,
    director: String,
    release_date: Option<Timestamp>,
    genre: String,
    rating: f32,
) -> Result<RecordDraft, ServiceError> {
    let release_date = release_date
        .map(|ts| {
            record::from_timestamp(&ts)
                .ok_or_else(|| ServiceError::invalid_argument("release_date is out of range"))
        })
        .transpose()?;
    Ok(RecordDraft {
        title,
        director,
        release_date,
        genre,
        rating,
    })
}

#[async_trait]
impl RecordOperations for RecordHandler {
    async fn create_record(
        &self,
        ctx: &RequestContext,
        request: proto::CreateRecordRequest,
    ) -> Result<proto::Record, ServiceError> {
        tracing::debug!(request_id = ctx.request_id(), "CreateRecord");
        let draft = draft(
            request.title,
            request.director,
            request.release_date,
            request.genre,
            request.rating,
        )?;
        ctx.run(self.service.create(draft)).await.map(to_proto)
    }

    async fn get_record(
        &self,
        ctx: &RequestContext,
        request: proto::GetRecordRequest,
    ) -> Result<proto::Record, ServiceError> {
        tracing::debug!(request_id = ctx.request_id(), record_id = request.id, "GetRecord");
        ctx.run(self.service.get(request.id)).await.map(to_proto)
    }

    async fn list_records(
        &self,
        ctx: &RequestContext,
        request: proto::ListRecordsRequest,
    ) -> Result<proto::ListRecordsResponse, ServiceError> {
        let page = Page::resolve(request.page_number.into(), request.page_size.into());
        tracing::debug!(
            request_id = ctx.request_id(),
            page = page.number,
            size = page.size,
            "ListRecords"
        );
        let (records, total) = ctx.run(self.service.list(page)).await?;
        Ok(proto::ListRecordsResponse {
            records: records.into_iter().map(to_proto).collect(),
            total_count: i32::try_from(total).unwrap_or(i32::MAX),
        })
    }

    async fn update_record(
        &self,
        ctx: &RequestContext,
        request: proto::UpdateRecordRequest,
    ) -> Result<proto::Record, ServiceError> {
        tracing::debug!(request_id = ctx.request_id(), record_id = request.id, "UpdateRecord");
        let id = request.id;
        let draft = draft(
            request.title,
            request.director,
            request.release_date,
            request.genre,
            request.rating,
        )?;
        ctx.run(self.service.update(id, draft)).await.map(to_proto)
    }

    async fn delete_record(
        &self,
        ctx: &RequestContext,
        request: proto::DeleteRecordRequest,
    ) -> Result<proto::DeleteRecordResponse, ServiceError> {
        tracing::debug!(request_id = ctx.request_id(), record_id = request.id, "DeleteRecord");
        ctx.run(self.service.delete(request.id)).await?;
        Ok(proto::DeleteRecordResponse { success: true })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{adapters::memory_store::MemoryRecordStore, core::error::ErrorKind};

    fn handler() -> RecordHandler {
        RecordHandler::new(RecordService::new(Arc::new(MemoryRecordStore::new())))
    }

    fn create_request(title: &str) -> proto::CreateRecordRequest {
        proto::CreateRecordRequest {
            title: title.into(),
            director: "Director".into(),
            release_date: Some(Timestamp {
                seconds: 946_684_800,
                nanos: 0,
            }),
            genre: "Drama".into(),
            rating: 6.5,
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let h = handler();
        let ctx = RequestContext::new("t");
        let created = h.create_record(&ctx, create_request("First")).await.unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.release_date.as_ref().unwrap().seconds, 946_684_800);

        let fetched = h
            .get_record(&ctx, proto::GetRecordRequest { id: created.id })
            .await
            .unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_list_clamps_paging_and_reports_total() {
        let h = handler();
        let ctx = RequestContext::new("t");
        for i in 0..12 {
            h.create_record(&ctx, create_request(&format!("r{i}"))).await.unwrap();
        }

        let defaulted = h
            .list_records(&ctx, proto::ListRecordsRequest { page_number: 0, page_size: -5 })
            .await
            .unwrap();
        assert_eq!(defaulted.records.len(), 10);
        assert_eq!(defaulted.total_count, 12);

        let second = h
            .list_records(&ctx, proto::ListRecordsRequest { page_number: 2, page_size: 5 })
            .await
            .unwrap();
        let ids: Vec<_> = second.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![6, 7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn test_missing_release_date_is_invalid() {
        let h = handler();
        let mut req = create_request("No date");
        req.release_date = None;
        let err = h
            .create_record(&RequestContext::new("t"), req)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_cancelled_context_is_unavailable() {
        let h = handler();
        let ctx = RequestContext::new("t");
        ctx.cancel();
        let err = h
            .get_record(&ctx, proto::GetRecordRequest { id: 1 })
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Cancelled);
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_delete_reports_success_then_not_found() {
        let h = handler();
        let ctx = RequestContext::new("t");
        let created = h.create_record(&ctx, create_request("gone")).await.unwrap();
        let deleted = h
            .delete_record(&ctx, proto::DeleteRecordRequest { id: created.id })
            .await
            .unwrap();
        assert!(deleted.success);
        let err = h
            .delete_record(&ctx, proto::DeleteRecordRequest { id: created.id })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
