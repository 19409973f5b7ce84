//! Request instrumentation and metric names for recordgate.
//!
//! Every inbound request, gRPC or HTTP, is wrapped by [`observe`], which
//! emits exactly one [`MetricSample`] to a [`MetricsSink`] however the
//! request ends: success, error, panic or the future being dropped. The
//! production sink ([`PrometheusSink`]) feeds the `metrics` facade, and the
//! Prometheus recorder installed by [`install_prometheus`] renders it at
//! `/metrics`.
//!
//! Provided metrics:
//! * `http_requests_total` (counter; labels `handler`, `code`, `method`)
//! * `http_request_duration_seconds` (histogram; labels `handler`, `method`)
//! * `record_creations_total`, `record_retrievals_total`,
//!   `record_updates_total`, `record_deletions_total` (counters)
use std::{any::Any, future::Future, panic::AssertUnwindSafe, sync::Arc, time::Instant};

use futures_util::FutureExt;
use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

pub use crate::ports::metrics_sink::{MetricSample, MetricsSink};
use crate::core::error::GatewayError;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const RECORD_CREATIONS_TOTAL: &str = "record_creations_total";
pub const RECORD_RETRIEVALS_TOTAL: &str = "record_retrievals_total";
pub const RECORD_UPDATES_TOTAL: &str = "record_updates_total";
pub const RECORD_DELETIONS_TOTAL: &str = "record_deletions_total";

/// Handler label of gRPC calls.
pub const RPC_HANDLER: &str = "grpc";
/// Handler label of requests arriving through the HTTP gateway.
pub const GATEWAY_HANDLER: &str = "grpc_gateway";

/// Status recorded when a request never reports one (panic or drop).
const UNFINISHED_STATUS: u16 = 500;

const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

static DESCRIPTIONS: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        HTTP_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of requests by handler, status code and method."
    );
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of requests by handler and method."
    );
    describe_counter!(RECORD_CREATIONS_TOTAL, Unit::Count, "Total number of records created.");
    describe_counter!(RECORD_RETRIEVALS_TOTAL, Unit::Count, "Total number of record retrievals.");
    describe_counter!(RECORD_UPDATES_TOTAL, Unit::Count, "Total number of records updated.");
    describe_counter!(RECORD_DELETIONS_TOTAL, Unit::Count, "Total number of records deleted.");
});

/// Register metric descriptions with the current recorder (idempotent).
pub fn init_metrics() {
    Lazy::force(&DESCRIPTIONS);
}

/// Install the process-wide Prometheus recorder and return the handle used to
/// render the exposition text.
pub fn install_prometheus() -> eyre::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            DURATION_BUCKETS,
        )?
        .install_recorder()?;
    init_metrics();
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Sink forwarding samples into the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusSink;

impl MetricsSink for PrometheusSink {
    fn record(&self, sample: &MetricSample) {
        counter!(
            HTTP_REQUESTS_TOTAL,
            "handler" => sample.handler_name,
            "code" => sample.status_code.to_string(),
            "method" => sample.method.clone()
        )
        .increment(1);
        histogram!(
            HTTP_REQUEST_DURATION_SECONDS,
            "handler" => sample.handler_name,
            "method" => sample.method.clone()
        )
        .record(sample.duration_seconds);
    }
}

/// Sink that drops every sample; used when metrics are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _sample: &MetricSample) {}
}

pub fn increment_record_creations() {
    counter!(RECORD_CREATIONS_TOTAL).increment(1);
}

pub fn increment_record_retrievals() {
    counter!(RECORD_RETRIEVALS_TOTAL).increment(1);
}

pub fn increment_record_updates() {
    counter!(RECORD_UPDATES_TOTAL).increment(1);
}

pub fn increment_record_deletions() {
    counter!(RECORD_DELETIONS_TOTAL).increment(1);
}

/// RAII guard for one in-flight request.
///
/// Emits its sample on drop. A guard dropped without [`complete`] (the
/// request future was cancelled or unwound) records status 500.
///
/// [`complete`]: InFlightRequest::complete
pub struct InFlightRequest {
    sink: Arc<dyn MetricsSink>,
    handler_name: &'static str,
    method: String,
    start: Instant,
    status_code: Option<u16>,
}

impl InFlightRequest {
    pub fn start(sink: Arc<dyn MetricsSink>, handler_name: &'static str, method: &str) -> Self {
        Self {
            sink,
            handler_name,
            method: method.to_string(),
            start: Instant::now(),
            status_code: None,
        }
    }

    pub fn complete(mut self, status_code: u16) {
        self.status_code = Some(status_code);
    }
}

impl Drop for InFlightRequest {
    fn drop(&mut self) {
        self.sink.record(&MetricSample {
            handler_name: self.handler_name,
            method: std::mem::take(&mut self.method),
            status_code: self.status_code.unwrap_or(UNFINISHED_STATUS),
            duration_seconds: self.start.elapsed().as_secs_f64(),
        });
    }
}

/// A request result the wrapper can read a status code from.
pub trait Outcome {
    fn status_code(&self) -> u16;
}

/// An error type a caught panic can be converted into.
pub trait FromPanic {
    fn from_panic(message: String) -> Self;
}

impl<B> Outcome for http::Response<B> {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

impl<T> Outcome for tonic::Response<T> {
    fn status_code(&self) -> u16 {
        200
    }
}

impl Outcome for GatewayError {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

impl FromPanic for GatewayError {
    fn from_panic(message: String) -> Self {
        GatewayError::internal(message)
    }
}

impl Outcome for tonic::Status {
    fn status_code(&self) -> u16 {
        grpc_code_to_http(self.code())
    }
}

impl FromPanic for tonic::Status {
    fn from_panic(message: String) -> Self {
        tonic::Status::internal(message)
    }
}

/// HTTP equivalent of a gRPC status code, as used for the `code` label.
pub fn grpc_code_to_http(code: tonic::Code) -> u16 {
    use tonic::Code;
    match code {
        Code::Ok => 200,
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => 400,
        Code::Unauthenticated => 401,
        Code::PermissionDenied => 403,
        Code::NotFound => 404,
        Code::AlreadyExists | Code::Aborted => 409,
        Code::ResourceExhausted => 429,
        Code::Cancelled => 499,
        Code::Unimplemented => 501,
        Code::Unavailable => 503,
        Code::DeadlineExceeded => 504,
        Code::Unknown | Code::Internal | Code::DataLoss => 500,
    }
}

/// Run `fut` under instrumentation. Panics inside the future are caught and
/// converted into an internal error; either way exactly one sample is
/// emitted.
pub async fn observe<F, T, E>(
    sink: Arc<dyn MetricsSink>,
    handler_name: &'static str,
    method: &str,
    fut: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    T: Outcome,
    E: Outcome + FromPanic,
{
    let guard = InFlightRequest::start(sink, handler_name, method);

    let result = match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(handler = handler_name, method, panic = %message, "request handler panicked");
            Err(E::from_panic(format!("handler panicked: {message}")))
        }
    };

    let status = match &result {
        Ok(value) => value.status_code(),
        Err(err) => err.status_code(),
    };
    guard.complete(status);
    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
