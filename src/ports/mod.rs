pub mod metrics_sink;
pub mod record_operations;
pub mod record_store;

pub use metrics_sink::{MetricSample, MetricsSink};
pub use record_operations::RecordOperations;
pub use record_store::{RecordStore, StoreError, StoreResult};
