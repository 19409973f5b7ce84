//! HTTP gateway listener: a manual accept loop over hyper-util connections so
//! shutdown can drain them with a deadline and close whatever is left.
use std::{
    net::SocketAddr,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::Duration,
};

use axum::Router;
use futures_util::FutureExt;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::{conn::auto, graceful},
    service::TowerToHyperService,
};
use tokio::{
    net::TcpListener,
    sync::oneshot,
    task::{JoinHandle, JoinSet},
    time::timeout,
};
use tracing::Instrument;

use crate::{
    server::{
        LifecycleError, ListenerOutcome,
        state::{ListenerState, Phase, ProtocolKind},
    },
    tracing_setup,
    utils::graceful_shutdown::{GracefulShutdown, ShutdownReason},
};

/// Pause after a failed `accept` before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Connections still owned by the listener once it stops accepting.
struct OpenConnections {
    graceful: graceful::GracefulShutdown,
    tasks: JoinSet<()>,
}

/// Handle of a running HTTP listener.
pub struct HttpListener {
    state: Arc<ListenerState>,
    local_addr: SocketAddr,
    grace: Duration,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<OpenConnections, String>>,
}

impl HttpListener {
    /// Bind `addr` and serve `router` in the background.
    ///
    /// `grace` bounds how long [`stop`](Self::stop) waits for in-flight
    /// requests.
    pub async fn bind(
        addr: SocketAddr,
        router: Router,
        state: Arc<ListenerState>,
        shutdown: GracefulShutdown,
        grace: Duration,
    ) -> Result<Self, LifecycleError> {
        let bind_error = |source| LifecycleError::Bind {
            protocol: ProtocolKind::Http,
            address: addr,
            source,
        };
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                let _ = state.transition(Phase::Failed);
                return Err(bind_error(source));
            }
        };
        let local_addr = listener.local_addr().map_err(bind_error)?;
        state.mark_listening(local_addr)?;
        tracing::info!(address = %local_addr, "HTTP gateway listener started");

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task_state = state.clone();
        let span = tracing_setup::listener_span(ProtocolKind::Http, local_addr);
        let task = tokio::spawn(
            async move {
                match AssertUnwindSafe(accept_loop(listener, router, stop_rx))
                    .catch_unwind()
                    .await
                {
                    Ok(open) => Ok(open),
                    Err(_) => {
                        let message = "accept loop panicked".to_string();
                        if task_state.transition(Phase::Failed).is_ok() {
                            tracing::error!("HTTP gateway listener failed: {message}");
                            shutdown
                                .trigger_shutdown(ShutdownReason::ListenerFailed(ProtocolKind::Http));
                        }
                        Err(message)
                    }
                }
            }
            .instrument(span),
        );

        Ok(Self {
            state,
            local_addr,
            grace,
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

    /// Stop accepting, wait up to the grace period for in-flight requests and
    /// close the connections still open at the deadline.
    pub async fn stop(mut self) -> ListenerOutcome {
        let draining = self.state.transition(Phase::Draining).is_ok();
        if draining {
            tracing::info!(grace = ?self.grace, "HTTP gateway listener draining");
        }
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        let outcome = match (&mut self.task).await {
            Ok(Ok(open)) => drain(open, self.grace).await,
            Ok(Err(message)) => ListenerOutcome::Failed(message),
            Err(e) => ListenerOutcome::Failed(format!("HTTP listener task ended abnormally: {e}")),
        };

        if draining {
            let _ = self.state.transition(Phase::Stopped);
        }
        tracing::info!(%outcome, phase = %self.state.phase(), "HTTP gateway listener stopped");
        outcome
    }
}

async fn accept_loop(
    listener: TcpListener,
    router: Router,
    mut stop_rx: oneshot::Receiver<()>,
) -> OpenConnections {
    let builder = auto::Builder::new(TokioExecutor::new());
    let graceful = graceful::GracefulShutdown::new();
    let mut tasks = JoinSet::new();

    loop {
        // Reap finished connections.
        while tasks.try_join_next().is_some() {}

        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            accepted = listener.accept() => {
                let (stream, remote_addr) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                let service = TowerToHyperService::new(router.clone());
                let conn = builder
                    .serve_connection_with_upgrades(TokioIo::new(stream), service)
                    .into_owned();
                let conn = graceful.watch(conn);
                tasks.spawn(async move {
                    if let Err(e) = conn.await {
                        tracing::debug!(%remote_addr, error = %e, "connection closed with error");
                    }
                });
            }
        }
    }

    // The listening socket closes here; queued connections are refused.
    drop(listener);
    OpenConnections { graceful, tasks }
}

async fn drain(open: OpenConnections, grace: Duration) -> ListenerOutcome {
    let OpenConnections {
        graceful,
        mut tasks,
    } = open;

    let outcome = match timeout(grace, graceful.shutdown()).await {
        Ok(()) => ListenerOutcome::Drained,
        Err(_) => {
            let open_connections = tasks.len();
            tracing::warn!(
                open_connections,
                "HTTP grace period elapsed, closing remaining connections"
            );
            tasks.abort_all();
            ListenerOutcome::ForceClosed { open_connections }
        }
    };
    while tasks.join_next().await.is_some() {}
    outcome
}
