//! Per-listener lifecycle state.
use std::{
    fmt,
    net::SocketAddr,
    sync::{
        OnceLock,
        atomic::{AtomicU8, Ordering},
    },
};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    Rpc,
    Http,
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::Rpc => f.write_str("rpc"),
            ProtocolKind::Http => f.write_str("http"),
        }
    }
}

/// `Created → Listening → Draining → Stopped`, with `Failed` reachable from
/// `Created` or `Listening`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    Created = 0,
    Listening = 1,
    Draining = 2,
    Stopped = 3,
    Failed = 4,
}

impl Phase {
    fn from_u8(value: u8) -> Phase {
        match value {
            0 => Phase::Created,
            1 => Phase::Listening,
            2 => Phase::Draining,
            3 => Phase::Stopped,
            _ => Phase::Failed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Created => "created",
            Phase::Listening => "listening",
            Phase::Draining => "draining",
            Phase::Stopped => "stopped",
            Phase::Failed => "failed",
        }
    }

    pub fn can_transition_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Created, Phase::Listening)
                | (Phase::Listening, Phase::Draining)
                | (Phase::Draining, Phase::Stopped)
                | (Phase::Created, Phase::Failed)
                | (Phase::Listening, Phase::Failed)
        )
    }

    /// Only a listening endpoint dispatches new requests.
    pub fn accepts_requests(self) -> bool {
        self == Phase::Listening
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{protocol} listener cannot move from {from} to {to}")]
pub struct TransitionError {
    pub protocol: ProtocolKind,
    pub from: Phase,
    pub to: Phase,
}

/// Lifecycle state of one listener. Shared read-only with request handlers;
/// only the coordinator and the listener tasks it owns move the phase.
#[derive(Debug)]
pub struct ListenerState {
    protocol: ProtocolKind,
    bound_address: OnceLock<SocketAddr>,
    phase: AtomicU8,
}

impl ListenerState {
    pub fn new(protocol: ProtocolKind) -> Self {
        Self {
            protocol,
            bound_address: OnceLock::new(),
            phase: AtomicU8::new(Phase::Created as u8),
        }
    }

    pub fn protocol(&self) -> ProtocolKind {
        self.protocol
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn bound_address(&self) -> Option<SocketAddr> {
        self.bound_address.get().copied()
    }

    /// Record the bound address and move to `Listening`.
    pub fn mark_listening(&self, address: SocketAddr) -> Result<(), TransitionError> {
        self.transition(Phase::Listening)?;
        let _ = self.bound_address.set(address);
        Ok(())
    }

    pub fn transition(&self, next: Phase) -> Result<Phase, TransitionError> {
        let mut current = self.phase.load(Ordering::Acquire);
        loop {
            let from = Phase::from_u8(current);
            if !from.can_transition_to(next) {
                return Err(TransitionError {
                    protocol: self.protocol,
                    from,
                    to: next,
                });
            }
            match self.phase.compare_exchange(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    tracing::debug!(protocol = %self.protocol, %from, to = %next, "listener phase changed");
                    return Ok(from);
                }
                Err(actual) => current = actual,
            }
        }
    }
}
