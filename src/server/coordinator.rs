//! Dual-listener coordinator.
//!
//! Start-up binds the gRPC listener first and the HTTP gateway second, both
//! backed by the same [`RecordOperations`] handler. Shutdown runs once, in a
//! fixed order: the HTTP gateway drains within its grace period (remaining
//! connections are then closed), and only after that the gRPC listener
//! drains with no deadline.
use std::{net::SocketAddr, sync::Arc};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::{
    adapters::{
        http_gateway::{GatewayState, build_router},
        rpc_service::RpcService,
    },
    config::models::ServerConfig,
    core::registry::OperationRegistry,
    metrics::MetricsSink,
    ports::record_operations::RecordOperations,
    server::{
        LifecycleError, ListenerOutcome,
        http_listener::HttpListener,
        rpc_listener::RpcListener,
        state::{ListenerState, ProtocolKind},
    },
    utils::graceful_shutdown::{GracefulShutdown, ShutdownReason},
};

/// Result of a completed shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub reason: ShutdownReason,
    pub http: ListenerOutcome,
    pub rpc: ListenerOutcome,
}

impl ShutdownReport {
    /// Whether the HTTP grace period ran out.
    pub fn http_forced(&self) -> bool {
        matches!(self.http, ListenerOutcome::ForceClosed { .. })
    }

    /// A failed listener or a failure-driven shutdown.
    pub fn is_failure(&self) -> bool {
        self.reason.is_failure() || self.http.is_failed() || self.rpc.is_failed()
    }
}

pub struct Coordinator {
    config: ServerConfig,
    handler: Arc<dyn RecordOperations>,
    sink: Arc<dyn MetricsSink>,
    prometheus: Option<PrometheusHandle>,
    shutdown: GracefulShutdown,
}

impl Coordinator {
    pub fn new(
        config: ServerConfig,
        handler: Arc<dyn RecordOperations>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            handler,
            sink,
            prometheus: None,
            shutdown: GracefulShutdown::new(),
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Trigger shared with both listeners; clone it to stop the server from
    /// elsewhere.
    pub fn shutdown_handle(&self) -> GracefulShutdown {
        self.shutdown.clone()
    }

    /// Bind and start both listeners. On any failure nothing is left serving.
    pub async fn start(self) -> Result<RunningServer, LifecycleError> {
        let config = &self.config;
        let rpc_addr = config
            .rpc_addr()
            .map_err(|source| LifecycleError::InvalidAddress {
                protocol: ProtocolKind::Rpc,
                address: format!("{}:{}", config.host, config.rpc_port),
                source,
            })?;
        let http_addr = config
            .http_addr()
            .map_err(|source| LifecycleError::InvalidAddress {
                protocol: ProtocolKind::Http,
                address: format!("{}:{}", config.host, config.http_port),
                source,
            })?;

        let registry = Arc::new(OperationRegistry::standard(self.handler.clone())?);
        let rpc_state = Arc::new(ListenerState::new(ProtocolKind::Rpc));
        let http_state = Arc::new(ListenerState::new(ProtocolKind::Http));

        let rpc_service = RpcService::new(
            self.handler.clone(),
            self.sink.clone(),
            config.request_timeout(),
        );
        let rpc = RpcListener::bind(
            rpc_addr,
            rpc_service,
            rpc_state.clone(),
            self.shutdown.clone(),
            config.rpc.reflection,
        )
        .await?;

        let mut gateway = GatewayState::new(
            registry,
            self.sink.clone(),
            http_state.clone(),
            rpc_state.clone(),
        )
        .with_request_timeout(config.request_timeout());
        if let Some(handle) = self.prometheus.clone() {
            gateway = gateway.with_prometheus(handle);
        }
        let router = build_router(gateway, config.cors.clone());

        let http = match HttpListener::bind(
            http_addr,
            router,
            http_state,
            self.shutdown.clone(),
            config.shutdown_grace(),
        )
        .await
        {
            Ok(http) => http,
            Err(err) => {
                tracing::error!(error = %err, "HTTP gateway failed to start, stopping gRPC listener");
                rpc.stop().await;
                return Err(err);
            }
        };

        tracing::info!(
            http = %http.local_addr(),
            rpc = %rpc.local_addr(),
            environment = %config.environment,
            "recordgate started"
        );

        Ok(RunningServer {
            http,
            rpc,
            shutdown: self.shutdown,
        })
    }
}

/// Both listeners up and serving.
pub struct RunningServer {
    http: HttpListener,
    rpc: RpcListener,
    shutdown: GracefulShutdown,
}

impl RunningServer {
    pub fn http_addr(&self) -> SocketAddr {
        self.http.local_addr()
    }

    pub fn rpc_addr(&self) -> SocketAddr {
        self.rpc.local_addr()
    }

    pub fn http_state(&self) -> &Arc<ListenerState> {
        self.http.state()
    }

    pub fn rpc_state(&self) -> &Arc<ListenerState> {
        self.rpc.state()
    }

    pub fn shutdown_handle(&self) -> GracefulShutdown {
        self.shutdown.clone()
    }

    /// Serve until SIGINT / SIGTERM, a manual trigger or a listener failure,
    /// then shut down.
    pub async fn run_until_shutdown(self) -> ShutdownReport {
        let signals = self.shutdown.clone();
        let signal_task = tokio::spawn(async move {
            if let Err(e) = signals.run_signal_handler().await {
                tracing::error!("Signal handler error: {}", e);
            }
        });

        let reason = self.shutdown.wait_for_shutdown_signal().await;
        signal_task.abort();
        self.stop(reason).await
    }

    /// Shut down now. If shutdown was already triggered the original reason
    /// is kept.
    pub async fn shutdown(self) -> ShutdownReport {
        self.shutdown.trigger_shutdown(ShutdownReason::Manual);
        let reason = self.shutdown.reason().unwrap_or(ShutdownReason::Manual);
        self.stop(reason).await
    }

    async fn stop(self, reason: ShutdownReason) -> ShutdownReport {
        tracing::info!(%reason, "Shutting down: HTTP gateway first, then gRPC");
        let RunningServer { http, rpc, .. } = self;

        let http = http.stop().await;
        if http.is_failed() {
            tracing::error!(outcome = %http, "HTTP gateway shutdown reported a failure");
        }
        let rpc = rpc.stop().await;
        if rpc.is_failed() {
            tracing::error!(outcome = %rpc, "gRPC shutdown reported a failure");
        }

        let report = ShutdownReport { reason, http, rpc };
        tracing::info!(
            %reason,
            http = %report.http,
            rpc = %report.rpc,
            "Graceful shutdown completed"
        );
        report
    }
}
