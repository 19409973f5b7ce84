//! Axum middleware attached to the gateway router: CORS, request ids and
//! request timing logs.
use std::{sync::Arc, time::Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::Response,
};

use crate::{config::models::CorsConfig, core::context::REQUEST_ID_HEADER};

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";
const MAX_AGE_SECS: &str = "3600";

/// CORS headers on every response; `OPTIONS` pre-flight requests are answered
/// here with 204 and never reach the gateway.
pub async fn cors_middleware(
    State(cors): State<Arc<CorsConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req.headers().get(header::ORIGIN).cloned();

    let mut response = if req.method() == Method::OPTIONS {
        let mut preflight = Response::new(Body::empty());
        *preflight.status_mut() = StatusCode::NO_CONTENT;
        preflight
    } else {
        next.run(req).await
    };

    let allow_origin = if cors.allows_any() {
        Some(HeaderValue::from_static("*"))
    } else {
        origin.filter(|o| o.to_str().map(|o| cors.allows(o)).unwrap_or(false))
    };

    let headers = response.headers_mut();
    if let Some(allow_origin) = allow_origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        if !cors.allows_any() {
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(MAX_AGE_SECS),
    );

    response
}

/// Ensure every request carries an `x-request-id` (a UUID v4 when the caller
/// sent none) and echo it on the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = match req.headers().get(REQUEST_ID_HEADER) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => {
            let generated = uuid::Uuid::new_v4().to_string();
            match HeaderValue::from_str(&generated) {
                Ok(value) => {
                    req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
                    value
                }
                Err(_) => return next.run(req).await,
            }
        }
    };

    let mut response = next.run(req).await;
    response.headers_mut().insert(REQUEST_ID_HEADER, request_id);
    response
}

/// Log completion of a request including latency.
pub async fn request_timing_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}

#[cfg(test)]
mod tests {
    use axum::{Router, middleware, routing::get};
    use tower::ServiceExt; // for oneshot

    use super::*;

    fn app(cors: CorsConfig) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(Arc::new(cors), cors_middleware))
    }

    #[tokio::test]
    async fn test_preflight_short_circuits() {
        let response = app(CorsConfig::default())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let headers = response.headers();
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            ALLOW_METHODS
        );
        assert_eq!(headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "3600");
    }

    #[tokio::test]
    async fn test_listed_origin_is_reflected() {
        let cors = CorsConfig {
            allowed_origins: vec!["https://app.example.com".to_string()],
        };
        let response = app(cors.clone())
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, "https://app.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example.com"
        );

        let response = app(cors)
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, "https://other.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_request_id_middleware() {
        let app = Router::new()
            .route(
                "/",
                get(|req: Request| async move {
                    req.headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                }),
            )
            .layer(middleware::from_fn(request_id_middleware));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let request_id = response.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(request_id).is_ok());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(REQUEST_ID_HEADER, "caller-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "caller-id");
    }
}
