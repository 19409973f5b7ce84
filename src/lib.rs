//! recordgate - one record service, two protocols.
//!
//! recordgate serves create / get / list / update / delete operations on
//! catalogue records over gRPC and over a JSON/HTTP gateway at the same time.
//! Both surfaces dispatch into the same handler instance; the gateway
//! translates HTTP requests into RPC messages in-process instead of making a
//! network hop.
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations)
//! while keeping business logic inside `core`:
//!
//! - [`core::template`] compiles and matches path templates such as
//!   `/v1/records/{id}`.
//! - [`core::translator`] turns path captures, query strings and JSON bodies
//!   into RPC messages, and RPC results back into JSON.
//! - [`core::registry`] binds each HTTP method and template to an operation
//!   and dispatches to the shared handler.
//! - [`metrics`] wraps every request on both protocols and records exactly one
//!   sample per request.
//! - [`server`] owns the two listeners and shuts them down in order: HTTP
//!   first within a grace period, then gRPC.
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use recordgate::{
//!     adapters::{MemoryRecordStore, RecordHandler},
//!     config::ServerConfig,
//!     core::RecordService,
//!     metrics::NoopSink,
//!     server::Coordinator,
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let store = Arc::new(MemoryRecordStore::new());
//! let handler = Arc::new(RecordHandler::new(RecordService::new(store)));
//! let server = Coordinator::new(ServerConfig::default(), handler, Arc::new(NoopSink))
//!     .start()
//!     .await?;
//! let report = server.run_until_shutdown().await;
//! println!("shutdown: http {}, rpc {}", report.http, report.rpc);
//! # Ok(()) }
//! ```
//!
//! # Error Handling
//! Request-path errors are typed `thiserror` enums mapped onto one taxonomy
//! (see [`core::error::ErrorKind`]) so both protocols report the same status
//! for the same condition. Application plumbing returns `eyre::Result<T>`
//! with `WrapErr` context.
//!
//! # Concurrency & Data Structures
//! Shared maps use `scc::HashMap`. The operation table is immutable once the
//! first request is dispatched and is read without locking.
pub mod config;
pub mod metrics;
pub mod ports;
pub mod proto;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;
pub mod server;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{MemoryRecordStore, RecordHandler},
    core::{OperationRegistry, RecordService},
    server::{Coordinator, RunningServer, ShutdownReport},
    utils::{GracefulShutdown, ShutdownReason},
};
