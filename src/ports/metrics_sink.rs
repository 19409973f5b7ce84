/// One completed request as seen by the instrumentation wrapper.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub handler_name: &'static str,
    pub method: String,
    pub status_code: u16,
    pub duration_seconds: f64,
}

/// MetricsSink receives exactly one sample per completed request and
/// aggregates it elsewhere (a Prometheus recorder in production).
pub trait MetricsSink: Send + Sync + 'static {
    fn record(&self, sample: &MetricSample);
}
