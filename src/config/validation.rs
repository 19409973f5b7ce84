use eyre::Result;

use crate::config::models::ServerConfig;

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Port conflict: http_port and rpc_port are both {port}")]
    PortConflict { port: u16 },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Server configuration validator
pub struct ServerConfigValidator;

impl ServerConfigValidator {
    /// Validate the entire server configuration, reporting every problem at
    /// once.
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        for (field, port) in [("http_port", config.http_port), ("rpc_port", config.rpc_port)] {
            if let Err(e) = Self::validate_listen_address(&config.host, port) {
                errors.push(e);
            }
            if port == 0 {
                errors.push(ValidationError::InvalidField {
                    field: field.to_string(),
                    message: "must be a non-zero port".to_string(),
                });
            }
        }

        if config.http_port == config.rpc_port {
            errors.push(ValidationError::PortConflict {
                port: config.http_port,
            });
        }

        if config.shutdown_grace_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "shutdown_grace_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if config.request_timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "request_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if config.log.level.trim().is_empty() {
            errors.push(ValidationError::InvalidField {
                field: "log.level".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if config.cors.allowed_origins.iter().any(|o| o.trim().is_empty()) {
            errors.push(ValidationError::InvalidField {
                field: "cors.allowed_origins".to_string(),
                message: "origins must not be empty strings".to_string(),
            });
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(&errors),
            }),
        }
    }

    fn validate_listen_address(host: &str, port: u16) -> ValidationResult<()> {
        let probe = ServerConfig {
            host: host.to_string(),
            http_port: port,
            ..ServerConfig::default()
        };
        probe
            .http_addr()
            .map(|_| ())
            .map_err(|e| ValidationError::InvalidListenAddress {
                address: format!("{host}:{port}"),
                reason: format!("host must be an IP address ({e})"),
            })
    }

    fn format_multiple_errors(errors: &[ValidationError]) -> String {
        let mut message = format!("{} configuration errors:", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("\n  {}. {}", i + 1, error));
        }
        message
    }
}
