//! JSON/HTTP gateway: an axum router whose fallback resolves every request
//! against the [`OperationRegistry`], translates it and dispatches it to the
//! shared record handler in-process.
use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    adapters::middleware::{cors_middleware, request_id_middleware, request_timing_middleware},
    config::models::CorsConfig,
    core::{
        context::{REQUEST_ID_HEADER, RequestContext},
        error::GatewayError,
        operation::RequestEnvelope,
        registry::OperationRegistry,
        translator::{HttpRequestParts, json_response},
    },
    metrics::{self, MetricsSink},
    server::state::ListenerState,
};

/// Largest request body the gateway reads.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a gateway request needs, shared by all connections.
#[derive(Clone)]
pub struct GatewayState {
    registry: Arc<OperationRegistry>,
    sink: Arc<dyn MetricsSink>,
    http: Arc<ListenerState>,
    rpc: Arc<ListenerState>,
    prometheus: Option<PrometheusHandle>,
    request_timeout: Duration,
}

impl GatewayState {
    pub fn new(
        registry: Arc<OperationRegistry>,
        sink: Arc<dyn MetricsSink>,
        http: Arc<ListenerState>,
        rpc: Arc<ListenerState>,
    ) -> Self {
        Self {
            registry,
            sink,
            http,
            rpc,
            prometheus: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Serve the Prometheus exposition text at `/metrics`.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Build the gateway router. `OPTIONS` requests are answered by the CORS
/// layer before routing.
pub fn build_router(state: GatewayState, cors: CorsConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(gateway_handler)
        .with_state(state)
        .layer(middleware::from_fn(request_timing_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn_with_state(Arc::new(cors), cors_middleware))
}

/// Fallback handler: every registry-bound request goes through here, wrapped
/// by the metrics observer.
pub async fn gateway_handler(State(state): State<GatewayState>, req: Request) -> Response {
    let method = req.method().to_string();
    let result = metrics::observe(
        state.sink.clone(),
        metrics::GATEWAY_HANDLER,
        &method,
        forward(&state, req),
    )
    .await;

    match result {
        Ok(response) => response,
        Err(err) => {
            if err.status().is_server_error() {
                tracing::error!(error = %err, "gateway request failed");
            } else {
                tracing::debug!(error = %err, "gateway request rejected");
            }
            err.into_response()
        }
    }
}

async fn forward(state: &GatewayState, req: Request) -> Result<Response, GatewayError> {
    let phase = state.http.phase();
    if !phase.accepts_requests() {
        return Err(GatewayError::Unavailable(format!("http listener is {phase}")));
    }

    let (parts, body) = req.into_parts();
    let matched = state.registry.resolve(&parts.method, parts.uri.path())?;

    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| GatewayError::invalid_argument(format!("failed to read request body: {e}")))?;

    let descriptor = matched.descriptor;
    let request = (descriptor.decoder)(&HttpRequestParts {
        captures: &matched.captures,
        query: parts.uri.query(),
        body: &body,
    })?;

    let request_id = parts
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok());
    let context =
        RequestContext::from_request_id(request_id).with_timeout(state.request_timeout);
    let _cancel = context.cancel_on_drop();

    tracing::debug!(
        operation = %descriptor.operation,
        template = descriptor.template.as_str(),
        request_id = context.request_id(),
        "dispatching gateway request"
    );

    let response = state
        .registry
        .dispatch(RequestEnvelope {
            operation: descriptor.operation,
            request,
            context,
        })
        .await?;

    let value = (descriptor.encoder)(response)?;
    Ok(json_response(value))
}

/// Listener phases of both protocols; 503 unless both are listening.
pub async fn health_handler(State(state): State<GatewayState>) -> Response {
    let http = state.http.phase();
    let rpc = state.rpc.phase();
    let healthy = http.accepts_requests() && rpc.accepts_requests();

    let (status, summary) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };
    let body = json!({
        "status": summary,
        "listeners": {
            "http": http.as_str(),
            "rpc": rpc.as_str(),
        },
    });
    (status, Json(body)).into_response()
}

pub async fn metrics_handler(State(state): State<GatewayState>, req: Request) -> Response {
    match &state.prometheus {
        Some(handle) => Response::builder()
            .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(Body::from(handle.render()))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        None => GatewayError::RouteNotFound {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
        }
        .into_response(),
    }
}
