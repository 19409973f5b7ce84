//! Configuration data structures for recordgate.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files and
//! to `RECORDGATE_*` environment variables. Every field has a default, so an
//! empty source yields a runnable configuration.
use std::{net::SocketAddr, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Free-form deployment name, logged at start-up
    pub environment: String,
    /// Interface both listeners bind to
    pub host: String,
    /// Port of the JSON/HTTP gateway
    pub http_port: u16,
    /// Port of the gRPC listener
    pub rpc_port: u16,
    /// Upper bound on HTTP draining before remaining connections are closed
    pub shutdown_grace_secs: u64,
    /// Deadline applied to every request on both protocols
    pub request_timeout_secs: u64,
    pub log: LogConfig,
    pub cors: CorsConfig,
    pub metrics: MetricsConfig,
    pub rpc: RpcConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            rpc_port: 50051,
            shutdown_grace_secs: 5,
            request_timeout_secs: 30,
            log: LogConfig::default(),
            cors: CorsConfig::default(),
            metrics: MetricsConfig::default(),
            rpc: RpcConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn http_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        socket_addr(&self.host, self.http_port)
    }

    pub fn rpc_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        socket_addr(&self.host, self.rpc_port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, std::net::AddrParseError> {
    // IPv6 literals need brackets in the joined form.
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}").parse()
    } else {
        format!("{host}:{port}").parse()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the gateway; `*` allows any origin
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allows_any() || self.allowed_origins.iter().any(|o| o == origin)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RpcConfig {
    /// Serve `grpc.reflection.v1` alongside the record API
    pub reflection: bool,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { reflection: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr().unwrap(), "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.rpc_addr().unwrap(), "0.0.0.0:50051".parse().unwrap());
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.cors.allows_any());
        assert!(config.metrics.enabled);
        assert!(config.rpc.reflection);
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        let config = ServerConfig {
            host: "::1".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(config.http_addr().unwrap(), "[::1]:8080".parse().unwrap());
    }

    #[test]
    fn test_cors_origin_list() {
        let cors = CorsConfig {
            allowed_origins: vec!["https://app.example.com".to_string()],
        };
        assert!(!cors.allows_any());
        assert!(cors.allows("https://app.example.com"));
        assert!(!cors.allows("https://evil.example.com"));
    }
}
