//! Error taxonomy shared by both protocol surfaces.
//!
//! Every failure a request can hit is classified into one [`ErrorKind`], and
//! the kind alone decides the HTTP status, the gRPC status code and the JSON
//! `code` string. That keeps both surfaces in agreement for the same
//! condition.
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-independent classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    RouteNotFound,
    Internal,
    Unavailable,
}

impl ErrorKind {
    pub fn http_status(self) -> StatusCode {
        match self {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound | ErrorKind::RouteNotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// gRPC code for the kind. `RouteNotFound` never reaches the RPC surface
    /// but maps to `NOT_FOUND` for completeness.
    pub fn grpc_code(self) -> tonic::Code {
        match self {
            ErrorKind::InvalidArgument => tonic::Code::InvalidArgument,
            ErrorKind::NotFound | ErrorKind::RouteNotFound => tonic::Code::NotFound,
            ErrorKind::Internal => tonic::Code::Internal,
            ErrorKind::Unavailable => tonic::Code::Unavailable,
        }
    }

    /// The `code` field of a JSON error body.
    pub fn as_code(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound | ErrorKind::RouteNotFound => "not_found",
            ErrorKind::Internal => "internal",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

/// Errors produced by the record handler and the domain service.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl ServiceError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ServiceError::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Internal(_) => ErrorKind::Internal,
            ServiceError::Unavailable(_)
            | ServiceError::Cancelled
            | ServiceError::DeadlineExceeded => ErrorKind::Unavailable,
        }
    }
}

impl From<ServiceError> for tonic::Status {
    fn from(err: ServiceError) -> Self {
        tonic::Status::new(err.kind().grpc_code(), err.to_string())
    }
}

/// Errors surfaced by the HTTP gateway: matcher and translator failures plus
/// whatever the dispatched handler returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    #[error("no route for {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl GatewayError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        GatewayError::InvalidArgument(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        GatewayError::Internal(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::RouteNotFound { .. } => ErrorKind::RouteNotFound,
            GatewayError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            GatewayError::Internal(_) => ErrorKind::Internal,
            GatewayError::Unavailable(_) => ErrorKind::Unavailable,
            GatewayError::Service(err) => err.kind(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().http_status()
    }

    /// JSON body for the error. Unmatched routes get a generic message so
    /// the response does not echo the request path back.
    pub fn body(&self) -> ErrorBody {
        let kind = self.kind();
        let message = match self {
            GatewayError::RouteNotFound { .. } => "Not Found".to_string(),
            other => other.to_string(),
        };
        ErrorBody {
            code: kind.as_code().to_string(),
            message,
        }
    }
}

/// Wire shape of every gateway error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_map_consistently_across_surfaces() {
        let cases = [
            (ErrorKind::InvalidArgument, 400, tonic::Code::InvalidArgument, "invalid_argument"),
            (ErrorKind::NotFound, 404, tonic::Code::NotFound, "not_found"),
            (ErrorKind::RouteNotFound, 404, tonic::Code::NotFound, "not_found"),
            (ErrorKind::Internal, 500, tonic::Code::Internal, "internal"),
            (ErrorKind::Unavailable, 503, tonic::Code::Unavailable, "unavailable"),
        ];
        for (kind, http, grpc, code) in cases {
            assert_eq!(kind.http_status().as_u16(), http, "{kind:?}");
            assert_eq!(kind.grpc_code(), grpc, "{kind:?}");
            assert_eq!(kind.as_code(), code, "{kind:?}");
        }
    }

    #[test]
    fn test_cancellation_and_deadline_are_unavailable() {
        assert_eq!(ServiceError::Cancelled.kind(), ErrorKind::Unavailable);
        assert_eq!(ServiceError::DeadlineExceeded.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn test_service_error_converts_to_status() {
        let status: tonic::Status = ServiceError::not_found("record 42 not found").into();
        assert_eq!(status.code(), tonic::Code::NotFound);
        assert_eq!(status.message(), "record 42 not found");
    }

    #[test]
    fn test_route_not_found_body_is_generic() {
        let err = GatewayError::RouteNotFound {
            method: "GET".into(),
            path: "/secret/path".into(),
        };
        let body = err.body();
        assert_eq!(body.code, "not_found");
        assert_eq!(body.message, "Not Found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_wrapped_service_error_keeps_its_kind() {
        let err = GatewayError::from(ServiceError::invalid_argument("title is required"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body().code, "invalid_argument");
        assert_eq!(err.body().message, "invalid argument: title is required");
    }
}
