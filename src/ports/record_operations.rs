use async_trait::async_trait;

use crate::{
    core::{context::RequestContext, error::ServiceError},
    proto::{
        CreateRecordRequest, DeleteRecordRequest, DeleteRecordResponse, GetRecordRequest,
        ListRecordsRequest, ListRecordsResponse, Record, UpdateRecordRequest,
    },
};

/// RecordOperations is the single operation surface both protocols reach.
///
/// The gRPC service and the HTTP gateway each hold the same
/// `Arc<dyn RecordOperations>`; neither knows about storage.
#[async_trait]
pub trait RecordOperations: Send + Sync + 'static {
    async fn create_record(
        &self,
        ctx: &RequestContext,
        request: CreateRecordRequest,
    ) -> Result<Record, ServiceError>;

    async fn get_record(
        &self,
        ctx: &RequestContext,
        request: GetRecordRequest,
    ) -> Result<Record, ServiceError>;

    async fn list_records(
        &self,
        ctx: &RequestContext,
        request: ListRecordsRequest,
    ) -> Result<ListRecordsResponse, ServiceError>;

    async fn update_record(
        &self,
        ctx: &RequestContext,
        request: UpdateRecordRequest,
    ) -> Result<Record, ServiceError>;

    async fn delete_record(
        &self,
        ctx: &RequestContext,
        request: DeleteRecordRequest,
    ) -> Result<DeleteRecordResponse, ServiceError>;
}
