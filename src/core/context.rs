//! Per-request context threaded from the listener down to persistence.
use std::{future::Future, time::Duration};

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::core::error::ServiceError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Cancellation token, optional deadline and tracing metadata of one request.
///
/// Clones share the same token, so cancelling any clone cancels them all.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Context with a freshly generated request id.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    /// Build from an optional inbound request id, generating one when the
    /// caller sent none.
    pub fn from_request_id(request_id: Option<&str>) -> Self {
        match request_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => Self::new(id),
            None => Self::generate(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Guard that cancels the context when dropped. Listeners hold it for
    /// the lifetime of the request future so a dropped connection cancels
    /// any work still running on its behalf.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.cancel.clone().drop_guard()
    }

    /// Run `fut` until it completes, the context is cancelled, or the
    /// deadline passes, whichever happens first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ServiceError::Cancelled),
            _ = deadline => Err(ServiceError::DeadlineExceeded),
            result = fut => result,
        }
    }
}
