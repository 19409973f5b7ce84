//! gRPC listener: a tonic server on its own task with a stop channel.
use std::{net::SocketAddr, sync::Arc};

use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::Instrument;

use crate::{
    adapters::rpc_service::RpcService,
    proto::FILE_DESCRIPTOR_SET,
    server::{
        LifecycleError, ListenerOutcome,
        state::{ListenerState, Phase, ProtocolKind},
    },
    tracing_setup,
    utils::graceful_shutdown::{GracefulShutdown, ShutdownReason},
};

/// Handle of a running gRPC listener.
#[derive(Debug)]
pub struct RpcListener {
    state: Arc<ListenerState>,
    local_addr: SocketAddr,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl RpcListener {
    /// Bind `addr` and start serving `service` in the background, together
    /// with gRPC server reflection when `reflection` is set.
    ///
    /// A serve error while listening marks the listener `Failed` and triggers
    /// process shutdown.
    pub async fn bind(
        addr: SocketAddr,
        service: RpcService,
        state: Arc<ListenerState>,
        shutdown: GracefulShutdown,
        reflection: bool,
    ) -> Result<Self, LifecycleError> {
        let reflection_service = if reflection {
            let built = tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
                .build_v1();
            match built {
                Ok(service) => Some(service),
                Err(err) => {
                    let _ = state.transition(Phase::Failed);
                    return Err(LifecycleError::Reflection(err));
                }
            }
        } else {
            None
        };

        let listener = match bind_tcp(addr).await {
            Ok(listener) => listener,
            Err(err) => {
                let _ = state.transition(Phase::Failed);
                return Err(err);
            }
        };
        let local_addr = listener.local_addr().map_err(|source| LifecycleError::Bind {
            protocol: ProtocolKind::Rpc,
            address: addr,
            source,
        })?;
        state.mark_listening(local_addr)?;
        tracing::info!(address = %local_addr, reflection, "gRPC listener started");

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task_state = state.clone();
        let span = tracing_setup::listener_span(ProtocolKind::Rpc, local_addr);
        let task = tokio::spawn(
            async move {
                let result = Server::builder()
                    .add_service(service.into_server())
                    .add_optional_service(reflection_service)
                    .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                        let _ = stop_rx.await;
                    })
                    .await;

                if let Err(e) = &result {
                    // Failing while still listening means nobody asked us to stop.
                    if task_state.transition(Phase::Failed).is_ok() {
                        tracing::error!(error = %e, "gRPC listener failed");
                        shutdown.trigger_shutdown(ShutdownReason::ListenerFailed(ProtocolKind::Rpc));
                    }
                }
                result
            }
            .instrument(span),
        );

        Ok(Self {
            state,
            local_addr,
            stop_tx: Some(stop_tx),
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> &Arc<ListenerState> {
        &self.state
    }

    /// Stop accepting and wait for every in-flight call, with no time limit.
    pub async fn stop(mut self) -> ListenerOutcome {
        let draining = self.state.transition(Phase::Draining).is_ok();
        if draining {
            tracing::info!("gRPC listener draining");
        }
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        let outcome = match (&mut self.task).await {
            Ok(Ok(())) => ListenerOutcome::Drained,
            Ok(Err(e)) => ListenerOutcome::Failed(e.to_string()),
            Err(e) => ListenerOutcome::Failed(format!("gRPC listener task ended abnormally: {e}")),
        };

        if draining {
            let _ = self.state.transition(Phase::Stopped);
        }
        tracing::info!(%outcome, phase = %self.state.phase(), "gRPC listener stopped");
        outcome
    }
}

async fn bind_tcp(addr: SocketAddr) -> Result<TcpListener, LifecycleError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| LifecycleError::Bind {
            protocol: ProtocolKind::Rpc,
            address: addr,
            source,
        })
}
