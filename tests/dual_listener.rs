// Both listeners over loopback: shared handler, status parity and ordered shutdown
#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use hyper::{Method, Request, StatusCode};
    use hyper_util::{
        client::legacy::{Client, connect::HttpConnector},
        rt::TokioExecutor,
    };
    use recordgate::{
        adapters::{MemoryRecordStore, RecordHandler},
        config::ServerConfig,
        core::{RecordService, RequestContext, ServiceError},
        metrics::NoopSink,
        ports::RecordOperations,
        proto::{
            CreateRecordRequest, DeleteRecordRequest, DeleteRecordResponse, GetRecordRequest,
            ListRecordsRequest, ListRecordsResponse, Record, RecordApiClient, UpdateRecordRequest,
        },
        server::{Coordinator, LifecycleError, ListenerOutcome, Phase, ProtocolKind, RunningServer},
        utils::ShutdownReason,
    };
    use serde_json::{Value, json};
    use tokio::{sync::Notify, time::timeout};

    type HttpClient = Client<HttpConnector, Full<Bytes>>;

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            http_port: 0,
            rpc_port: 0,
            shutdown_grace_secs: 1,
            ..ServerConfig::default()
        }
    }

    fn record_handler() -> Arc<RecordHandler> {
        let store = Arc::new(MemoryRecordStore::new());
        Arc::new(RecordHandler::new(RecordService::new(store)))
    }

    async fn start(handler: Arc<dyn RecordOperations>) -> RunningServer {
        Coordinator::new(test_config(), handler, Arc::new(NoopSink))
            .start()
            .await
            .unwrap()
    }

    fn http_client() -> HttpClient {
        Client::builder(TokioExecutor::new()).build_http()
    }

    async fn http_call(
        client: &HttpClient,
        server_addr: std::net::SocketAddr,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value), hyper_util::client::legacy::Error> {
        let body = body.map(|v| v.to_string()).unwrap_or_default();
        let request = Request::builder()
            .method(method)
            .uri(format!("http://{server_addr}{path}"))
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap();
        let response = client.request(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Ok((status, value))
    }

    async fn rpc_client(running: &RunningServer) -> RecordApiClient<tonic::transport::Channel> {
        RecordApiClient::connect(format!("http://{}", running.rpc_addr()))
            .await
            .unwrap()
    }

    async fn rpc_channel(running: &RunningServer) -> tonic::transport::Channel {
        tonic::transport::Channel::from_shared(format!("http://{}", running.rpc_addr()))
            .unwrap()
            .connect()
            .await
            .unwrap()
    }

    /// Delegates to a real handler; `get_record` hangs and `list_records` is
    /// slow, each announcing itself on `entered` first.
    struct SlowHandler {
        inner: Arc<RecordHandler>,
        entered: Arc<Notify>,
        list_delay: Duration,
    }

    #[async_trait]
    impl RecordOperations for SlowHandler {
        async fn create_record(
            &self,
            ctx: &RequestContext,
            request: CreateRecordRequest,
        ) -> Result<Record, ServiceError> {
            self.inner.create_record(ctx, request).await
        }

        async fn get_record(
            &self,
            ctx: &RequestContext,
            _request: GetRecordRequest,
        ) -> Result<Record, ServiceError> {
            self.entered.notify_one();
            ctx.run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(ServiceError::internal("woke up"))
            })
            .await
        }

        async fn list_records(
            &self,
            ctx: &RequestContext,
            request: ListRecordsRequest,
        ) -> Result<ListRecordsResponse, ServiceError> {
            self.entered.notify_one();
            tokio::time::sleep(self.list_delay).await;
            self.inner.list_records(ctx, request).await
        }

        async fn update_record(
            &self,
            ctx: &RequestContext,
            request: UpdateRecordRequest,
        ) -> Result<Record, ServiceError> {
            self.inner.update_record(ctx, request).await
        }

        async fn delete_record(
            &self,
            ctx: &RequestContext,
            request: DeleteRecordRequest,
        ) -> Result<DeleteRecordResponse, ServiceError> {
            self.inner.delete_record(ctx, request).await
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_both_protocols_share_one_handler() {
        let running = start(record_handler()).await;
        assert_eq!(running.http_state().phase(), Phase::Listening);
        assert_eq!(running.rpc_state().phase(), Phase::Listening);

        let client = http_client();
        let (status, created) = http_call(
            &client,
            running.http_addr(),
            Method::POST,
            "/v1/records",
            Some(json!({
                "title": "Heat",
                "director": "Michael Mann",
                "releaseDate": "1995-12-15T00:00:00Z",
                "genre": "Crime",
                "rating": 8.3,
            })),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);
        let id = created["id"].as_i64().unwrap();

        let mut rpc = rpc_client(&running).await;
        let record = rpc
            .get_record(GetRecordRequest { id })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(record.title, "Heat");
        assert_eq!(record.director, "Michael Mann");

        let report = running.shutdown().await;
        assert_eq!(report.reason, ShutdownReason::Manual);
        assert_eq!(report.http, ListenerOutcome::Drained);
        assert_eq!(report.rpc, ListenerOutcome::Drained);
        assert!(!report.is_failure());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_status_parity_between_protocols() {
        let running = start(record_handler()).await;
        let client = http_client();
        let mut rpc = rpc_client(&running).await;

        let (status, body) = http_call(&client, running.http_addr(), Method::GET, "/v1/records/42", None)
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
        let err = rpc.get_record(GetRecordRequest { id: 42 }).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);
        assert_eq!(err.message(), body["message"].as_str().unwrap());

        let (status, body) = http_call(
            &client,
            running.http_addr(),
            Method::POST,
            "/v1/records",
            Some(json!({"title": "", "director": "D"})),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_argument");
        let err = rpc
            .create_record(CreateRecordRequest {
                title: String::new(),
                director: "D".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);

        running.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_trigger_is_a_no_op() {
        let running = start(record_handler()).await;
        let shutdown = running.shutdown_handle();

        let server = tokio::spawn(running.run_until_shutdown());
        assert!(shutdown.trigger_shutdown(ShutdownReason::Signal));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!shutdown.trigger_shutdown(ShutdownReason::Manual));

        let report = timeout(Duration::from_secs(10), server)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.reason, ShutdownReason::Signal);
        assert_eq!(report.http, ListenerOutcome::Drained);
        assert_eq!(report.rpc, ListenerOutcome::Drained);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_http_is_force_closed_while_rpc_drains() {
        let entered = Arc::new(Notify::new());
        let handler = Arc::new(SlowHandler {
            inner: record_handler(),
            entered: entered.clone(),
            list_delay: Duration::from_millis(1500),
        });
        let running = start(handler).await;
        let http_addr = running.http_addr();
        let http_state = running.http_state().clone();
        let rpc_state = running.rpc_state().clone();

        // A gRPC call that finishes on its own, after the HTTP grace period.
        let mut rpc = rpc_client(&running).await;
        let rpc_call = tokio::spawn(async move {
            rpc.list_records(ListRecordsRequest {
                page_number: 1,
                page_size: 10,
            })
            .await
        });
        timeout(Duration::from_secs(5), entered.notified()).await.unwrap();

        // An HTTP request that never finishes.
        let http_call_task = tokio::spawn(async move {
            let client = http_client();
            http_call(&client, http_addr, Method::GET, "/v1/records/1", None).await
        });
        timeout(Duration::from_secs(5), entered.notified()).await.unwrap();

        let report = timeout(Duration::from_secs(10), running.shutdown())
            .await
            .unwrap();
        assert!(report.http_forced());
        assert!(matches!(report.http, ListenerOutcome::ForceClosed { .. }));
        assert_eq!(report.rpc, ListenerOutcome::Drained);
        assert_eq!(http_state.phase(), Phase::Stopped);
        assert_eq!(rpc_state.phase(), Phase::Stopped);

        // The hung HTTP request lost its connection; the gRPC call completed.
        assert!(http_call_task.await.unwrap().is_err());
        let listed = rpc_call.await.unwrap().unwrap().into_inner();
        assert_eq!(listed.total_count, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rpc_keeps_listening_until_http_has_stopped() {
        let entered = Arc::new(Notify::new());
        let handler = Arc::new(SlowHandler {
            inner: record_handler(),
            entered: entered.clone(),
            list_delay: Duration::from_millis(1500),
        });
        let running = start(handler).await;
        let http_addr = running.http_addr();
        let http_state = running.http_state().clone();
        let rpc_state = running.rpc_state().clone();

        // Keep both listeners busy so each one spends time in Draining.
        let mut rpc = rpc_client(&running).await;
        let rpc_call = tokio::spawn(async move {
            rpc.list_records(ListRecordsRequest {
                page_number: 1,
                page_size: 10,
            })
            .await
        });
        timeout(Duration::from_secs(5), entered.notified()).await.unwrap();
        let http_call_task = tokio::spawn(async move {
            let client = http_client();
            http_call(&client, http_addr, Method::GET, "/v1/records/1", None).await
        });
        timeout(Duration::from_secs(5), entered.notified()).await.unwrap();

        let sampler = tokio::spawn(async move {
            let mut seen = Vec::new();
            loop {
                let snapshot = (http_state.phase(), rpc_state.phase());
                if seen.last() != Some(&snapshot) {
                    seen.push(snapshot);
                }
                if snapshot == (Phase::Stopped, Phase::Stopped) {
                    return seen;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let report = timeout(Duration::from_secs(10), running.shutdown())
            .await
            .unwrap();
        assert_eq!(report.rpc, ListenerOutcome::Drained);
        let seen = timeout(Duration::from_secs(5), sampler).await.unwrap().unwrap();

        // gRPC only leaves Listening once HTTP is fully stopped.
        for (http, rpc) in &seen {
            if *rpc != Phase::Listening {
                assert_eq!(*http, Phase::Stopped, "phase history: {seen:?}");
            }
        }
        assert!(
            seen.contains(&(Phase::Draining, Phase::Listening)),
            "phase history: {seen:?}"
        );
        assert!(
            seen.contains(&(Phase::Stopped, Phase::Draining)),
            "phase history: {seen:?}"
        );

        let _ = http_call_task.await;
        assert!(rpc_call.await.unwrap().is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reflection_lists_the_record_service() {
        use tonic_reflection::pb::v1::{
            ServerReflectionRequest, server_reflection_client::ServerReflectionClient,
            server_reflection_request::MessageRequest,
            server_reflection_response::MessageResponse,
        };

        let running = start(record_handler()).await;
        let mut client = ServerReflectionClient::new(rpc_channel(&running).await);
        let request = ServerReflectionRequest {
            host: String::new(),
            message_request: Some(MessageRequest::ListServices(String::new())),
        };
        let mut responses = client
            .server_reflection_info(tokio_stream::once(request))
            .await
            .unwrap()
            .into_inner();
        let response = responses.message().await.unwrap().unwrap();

        let Some(MessageResponse::ListServicesResponse(list)) = &response.message_response else {
            panic!("unexpected reflection response: {response:?}");
        };
        let names: Vec<&str> = list.service.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"recordgate.v1.RecordApi"), "services: {names:?}");

        running.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reflection_can_be_disabled() {
        use tonic_reflection::pb::v1::{
            ServerReflectionRequest, server_reflection_client::ServerReflectionClient,
            server_reflection_request::MessageRequest,
        };

        let mut config = test_config();
        config.rpc.reflection = false;
        let running = Coordinator::new(config, record_handler(), Arc::new(NoopSink))
            .start()
            .await
            .unwrap();

        let mut client = ServerReflectionClient::new(rpc_channel(&running).await);
        let request = ServerReflectionRequest {
            host: String::new(),
            message_request: Some(MessageRequest::ListServices(String::new())),
        };
        let err = client
            .server_reflection_info(tokio_stream::once(request))
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unimplemented);

        running.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_http_bind_failure_stops_everything() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            http_port: occupied.local_addr().unwrap().port(),
            ..test_config()
        };

        let err = Coordinator::new(config, record_handler(), Arc::new(NoopSink))
            .start()
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            LifecycleError::Bind {
                protocol: ProtocolKind::Http,
                ..
            }
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rpc_bind_failure_is_reported() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            rpc_port: occupied.local_addr().unwrap().port(),
            ..test_config()
        };

        let err = Coordinator::new(config, record_handler(), Arc::new(NoopSink))
            .start()
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            LifecycleError::Bind {
                protocol: ProtocolKind::Rpc,
                ..
            }
        ));
    }
}
