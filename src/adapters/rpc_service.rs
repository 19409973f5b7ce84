//! gRPC surface: the generated `RecordApi` trait implemented by forwarding
//! every call to the shared [`RecordOperations`] handler.
use std::{sync::Arc, time::Duration};

use tonic::{Request, Response, Status};

use crate::{
    core::{
        context::{REQUEST_ID_HEADER, RequestContext},
        operation::OperationId,
    },
    metrics::{self, MetricsSink},
    ports::record_operations::RecordOperations,
    proto::{
        CreateRecordRequest, DeleteRecordRequest, DeleteRecordResponse, GetRecordRequest,
        ListRecordsRequest, ListRecordsResponse, Record, RecordApi, RecordApiServer,
        UpdateRecordRequest,
    },
};

#[derive(Clone)]
pub struct RpcService {
    handler: Arc<dyn RecordOperations>,
    sink: Arc<dyn MetricsSink>,
    request_timeout: Duration,
}

impl RpcService {
    pub fn new(
        handler: Arc<dyn RecordOperations>,
        sink: Arc<dyn MetricsSink>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            handler,
            sink,
            request_timeout,
        }
    }

    pub fn into_server(self) -> RecordApiServer<Self> {
        RecordApiServer::new(self)
    }

    fn context<T>(&self, request: &Request<T>) -> RequestContext {
        let request_id = request
            .metadata()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok());
        RequestContext::from_request_id(request_id).with_timeout(self.request_timeout)
    }
}

#[tonic::async_trait]
impl RecordApi for RpcService {
    async fn create_record(
        &self,
        request: Request<CreateRecordRequest>,
    ) -> Result<Response<Record>, Status> {
        let ctx = self.context(&request);
        let _cancel = ctx.cancel_on_drop();
        metrics::observe(
            self.sink.clone(),
            metrics::RPC_HANDLER,
            OperationId::CreateRecord.rpc_path(),
            async {
                let record = self.handler.create_record(&ctx, request.into_inner()).await?;
                Ok::<_, Status>(Response::new(record))
            },
        )
        .await
    }

    async fn get_record(
        &self,
        request: Request<GetRecordRequest>,
    ) -> Result<Response<Record>, Status> {
        let ctx = self.context(&request);
        let _cancel = ctx.cancel_on_drop();
        metrics::observe(
            self.sink.clone(),
            metrics::RPC_HANDLER,
            OperationId::GetRecord.rpc_path(),
            async {
                let record = self.handler.get_record(&ctx, request.into_inner()).await?;
                Ok::<_, Status>(Response::new(record))
            },
        )
        .await
    }

    async fn list_records(
        &self,
        request: Request<ListRecordsRequest>,
    ) -> Result<Response<ListRecordsResponse>, Status> {
        let ctx = self.context(&request);
        let _cancel = ctx.cancel_on_drop();
        metrics::observe(
            self.sink.clone(),
            metrics::RPC_HANDLER,
            OperationId::ListRecords.rpc_path(),
            async {
                let list = self.handler.list_records(&ctx, request.into_inner()).await?;
                Ok::<_, Status>(Response::new(list))
            },
        )
        .await
    }

    async fn update_record(
        &self,
        request: Request<UpdateRecordRequest>,
    ) -> Result<Response<Record>, Status> {
        let ctx = self.context(&request);
        let _cancel = ctx.cancel_on_drop();
        metrics::observe(
            self.sink.clone(),
            metrics::RPC_HANDLER,
            OperationId::UpdateRecord.rpc_path(),
            async {
                let record = self.handler.update_record(&ctx, request.into_inner()).await?;
                Ok::<_, Status>(Response::new(record))
            },
        )
        .await
    }

    async fn delete_record(
        &self,
        request: Request<DeleteRecordRequest>,
    ) -> Result<Response<DeleteRecordResponse>, Status> {
        let ctx = self.context(&request);
        let _cancel = ctx.cancel_on_drop();
        metrics::observe(
            self.sink.clone(),
            metrics::RPC_HANDLER,
            OperationId::DeleteRecord.rpc_path(),
            async {
                let deleted = self.handler.delete_record(&ctx, request.into_inner()).await?;
                Ok::<_, Status>(Response::new(deleted))
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        adapters::{memory_store::MemoryRecordStore, rpc_handler::RecordHandler},
        core::service::RecordService,
        metrics::MetricSample,
    };

    #[derive(Default)]
    struct CaptureSink(Mutex<Vec<MetricSample>>);

    impl MetricsSink for CaptureSink {
        fn record(&self, sample: &MetricSample) {
            self.0.lock().unwrap().push(sample.clone());
        }
    }

    fn service(sink: Arc<CaptureSink>) -> RpcService {
        let handler = Arc::new(RecordHandler::new(RecordService::new(Arc::new(
            MemoryRecordStore::new(),
        ))));
        RpcService::new(handler, sink, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_not_found_maps_to_status_and_metric() {
        let sink = Arc::new(CaptureSink::default());
        let svc = service(sink.clone());

        let status = svc
            .get_record(Request::new(GetRecordRequest { id: 42 }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let samples = sink.0.lock().unwrap().clone();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].handler_name, "grpc");
        assert_eq!(samples[0].method, "/recordgate.v1.RecordApi/GetRecord");
        assert_eq!(samples[0].status_code, 404);
    }

    #[tokio::test]
    async fn test_invalid_create_is_invalid_argument() {
        let sink = Arc::new(CaptureSink::default());
        let svc = service(sink.clone());
        let status = svc
            .create_record(Request::new(CreateRecordRequest {
                title: String::new(),
                director: "D".into(),
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert_eq!(sink.0.lock().unwrap()[0].status_code, 400);
    }

    #[tokio::test]
    async fn test_list_on_empty_store_succeeds() {
        let sink = Arc::new(CaptureSink::default());
        let svc = service(sink.clone());
        let list = svc
            .list_records(Request::new(ListRecordsRequest::default()))
            .await
            .unwrap()
            .into_inner();
        assert!(list.records.is_empty());
        assert_eq!(list.total_count, 0);
        assert_eq!(sink.0.lock().unwrap()[0].status_code, 200);
    }
}
