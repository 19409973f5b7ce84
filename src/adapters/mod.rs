pub mod http_gateway;
pub mod memory_store;
pub mod middleware;
pub mod rpc_handler;
pub mod rpc_service;

/// Re-export commonly used types from adapters
pub use http_gateway::{GatewayState, build_router};
pub use memory_store::MemoryRecordStore;
pub use middleware::*;
pub use rpc_handler::RecordHandler;
pub use rpc_service::RpcService;
