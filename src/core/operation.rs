//! Operation identifiers and the request/response values the gateway
//! dispatches. The payloads are the RPC messages themselves, so the HTTP
//! path hands the handler exactly what a gRPC client would have sent.
use std::fmt;

use crate::{
    core::context::RequestContext,
    proto::{
        CreateRecordRequest, DeleteRecordRequest, DeleteRecordResponse, GetRecordRequest,
        ListRecordsRequest, ListRecordsResponse, Record, SERVICE_NAME, UpdateRecordRequest,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationId {
    CreateRecord,
    GetRecord,
    ListRecords,
    UpdateRecord,
    DeleteRecord,
}

impl OperationId {
    pub const ALL: [OperationId; 5] = [
        OperationId::CreateRecord,
        OperationId::GetRecord,
        OperationId::ListRecords,
        OperationId::UpdateRecord,
        OperationId::DeleteRecord,
    ];

    /// RPC method name as it appears on the wire.
    pub fn name(self) -> &'static str {
        match self {
            OperationId::CreateRecord => "CreateRecord",
            OperationId::GetRecord => "GetRecord",
            OperationId::ListRecords => "ListRecords",
            OperationId::UpdateRecord => "UpdateRecord",
            OperationId::DeleteRecord => "DeleteRecord",
        }
    }

    /// Full gRPC method path, e.g. `/recordgate.v1.RecordApi/GetRecord`.
    pub fn rpc_path(self) -> &'static str {
        match self {
            OperationId::CreateRecord => "/recordgate.v1.RecordApi/CreateRecord",
            OperationId::GetRecord => "/recordgate.v1.RecordApi/GetRecord",
            OperationId::ListRecords => "/recordgate.v1.RecordApi/ListRecords",
            OperationId::UpdateRecord => "/recordgate.v1.RecordApi/UpdateRecord",
            OperationId::DeleteRecord => "/recordgate.v1.RecordApi/DeleteRecord",
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SERVICE_NAME}.{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    Create(CreateRecordRequest),
    Get(GetRecordRequest),
    List(ListRecordsRequest),
    Update(UpdateRecordRequest),
    Delete(DeleteRecordRequest),
}

impl OperationRequest {
    /// The operation this request value belongs to.
    pub fn operation(&self) -> OperationId {
        match self {
            OperationRequest::Create(_) => OperationId::CreateRecord,
            OperationRequest::Get(_) => OperationId::GetRecord,
            OperationRequest::List(_) => OperationId::ListRecords,
            OperationRequest::Update(_) => OperationId::UpdateRecord,
            OperationRequest::Delete(_) => OperationId::DeleteRecord,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationResponse {
    Record(Record),
    RecordList(ListRecordsResponse),
    Deleted(DeleteRecordResponse),
}

/// A translated request travelling from the gateway to the handler.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub operation: OperationId,
    pub request: OperationRequest,
    pub context: RequestContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_paths_follow_service_name() {
        for op in OperationId::ALL {
            assert_eq!(op.rpc_path(), format!("/{SERVICE_NAME}/{}", op.name()));
        }
    }

    #[test]
    fn test_request_variant_names_its_operation() {
        assert_eq!(
            OperationRequest::Get(GetRecordRequest { id: 1 }).operation(),
            OperationId::GetRecord
        );
        assert_eq!(
            OperationRequest::List(ListRecordsRequest::default()).operation(),
            OperationId::ListRecords
        );
    }
}
