//! Listener lifecycle: the gRPC and HTTP listeners and the coordinator that
//! starts them together and stops them in order.
use std::{fmt, net::SocketAddr};

use thiserror::Error;

use crate::core::registry::RegistryError;

pub mod coordinator;
pub mod http_listener;
pub mod rpc_listener;
pub mod state;

pub use coordinator::{Coordinator, RunningServer, ShutdownReport};
pub use http_listener::HttpListener;
pub use rpc_listener::RpcListener;
pub use state::{ListenerState, Phase, ProtocolKind, TransitionError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid {protocol} listen address '{address}'")]
    InvalidAddress {
        protocol: ProtocolKind,
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {protocol} listener on {address}")]
    Bind {
        protocol: ProtocolKind,
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("{protocol} listener failed: {message}")]
    Serve {
        protocol: ProtocolKind,
        message: String,
    },

    #[error("invalid operation table: {0}")]
    Registry(#[from] RegistryError),

    #[error("failed to build gRPC reflection service: {0}")]
    Reflection(#[from] tonic_reflection::server::Error),
}

/// How one listener ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerOutcome {
    /// Every in-flight request completed.
    Drained,
    /// The grace period ran out and the remaining connections were closed.
    ForceClosed { open_connections: usize },
    /// The listener failed, before or during shutdown.
    Failed(String),
}

impl ListenerOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ListenerOutcome::Failed(_))
    }
}

impl fmt::Display for ListenerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerOutcome::Drained => f.write_str("drained"),
            ListenerOutcome::ForceClosed { open_connections } => {
                write!(f, "force-closed {open_connections} connection(s)")
            }
            ListenerOutcome::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}
