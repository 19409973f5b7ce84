use std::path::Path;

use config::{Config, Environment, File, FileFormat, Map};
use eyre::{Context, Result};

use crate::config::models::ServerConfig;

/// Prefix of environment variable overrides, e.g. `RECORDGATE_HTTP_PORT` or
/// `RECORDGATE_LOG__LEVEL`.
pub const ENV_PREFIX: &str = "RECORDGATE";

/// Load configuration: built-in defaults, then the optional file, then the
/// process environment.
///
/// When `required` is false a missing file is skipped.
pub fn load_config(config_path: Option<&str>, required: bool) -> Result<ServerConfig> {
    load_config_with_env(config_path, required, None)
}

/// Same as [`load_config`] but reads environment overrides from `env` when
/// given instead of the process environment.
pub fn load_config_with_env(
    config_path: Option<&str>,
    required: bool,
    env: Option<Map<String, String>>,
) -> Result<ServerConfig> {
    let mut builder = Config::builder();

    if let Some(config_path) = config_path {
        let path = Path::new(config_path);
        builder = builder.add_source(
            File::new(
                path.to_str()
                    .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", path.display()))?,
                file_format(path),
            )
            .required(required),
        );
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("cors.allowed_origins")
            .try_parsing(true)
            .source(env),
    );

    let source = config_path.unwrap_or("<defaults>");
    let settings = builder
        .build()
        .with_context(|| format!("Failed to build config from {source}"))?;

    settings
        .try_deserialize()
        .with_context(|| format!("Failed to deserialize config from {source}"))
}

/// Determine file format based on extension (TOML when unknown).
fn file_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        _ => FileFormat::Toml,
    }
}

/// Starting configuration written by `recordgate init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# recordgate configuration
#
# Every key can be overridden from the environment, e.g.
# RECORDGATE_HTTP_PORT=9090 or RECORDGATE_LOG__LEVEL=debug.

environment = "development"

# Both listeners bind to this interface
host = "0.0.0.0"
http_port = 8080
rpc_port = 50051

# HTTP connections still open this long after shutdown starts are closed
shutdown_grace_secs = 5
request_timeout_secs = 30

[log]
level = "info"
json = false

[cors]
allowed_origins = ["*"]

[metrics]
enabled = true

[rpc]
# Serve gRPC server reflection (grpc.reflection.v1)
reflection = true
"#;

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn no_env() -> Option<Map<String, String>> {
        Some(Map::new())
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = load_config_with_env(None, false, no_env()).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            temp_file,
            r#"
environment = "staging"
http_port = 9090
shutdown_grace_secs = 2

[log]
level = "debug"
json = true

[cors]
allowed_origins = ["https://app.example.com"]
"#
        )
        .unwrap();

        let config =
            load_config_with_env(temp_file.path().to_str(), true, no_env()).unwrap();
        assert_eq!(config.environment, "staging");
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.rpc_port, 50051);
        assert_eq!(config.shutdown_grace_secs, 2);
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);
        assert_eq!(config.cors.allowed_origins, vec!["https://app.example.com"]);
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(temp_file, r#"{{"rpc_port": 6000, "metrics": {{"enabled": false}}}}"#).unwrap();

        let config =
            load_config_with_env(temp_file.path().to_str(), true, no_env()).unwrap();
        assert_eq!(config.rpc_port, 6000);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "http_port = 9090\n").unwrap();

        let mut env = Map::new();
        env.insert("RECORDGATE_HTTP_PORT".to_string(), "7070".to_string());
        env.insert("RECORDGATE_LOG__LEVEL".to_string(), "warn".to_string());
        env.insert("RECORDGATE_RPC__REFLECTION".to_string(), "false".to_string());
        env.insert(
            "RECORDGATE_CORS__ALLOWED_ORIGINS".to_string(),
            "https://a.example,https://b.example".to_string(),
        );

        let config =
            load_config_with_env(temp_file.path().to_str(), true, Some(env)).unwrap();
        assert_eq!(config.http_port, 7070);
        assert_eq!(config.log.level, "warn");
        assert!(!config.rpc.reflection);
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(load_config_with_env(Some("/nonexistent/recordgate.toml"), true, no_env()).is_err());
        let config =
            load_config_with_env(Some("/nonexistent/recordgate.toml"), false, no_env()).unwrap();
        assert_eq!(config.http_port, 8080);
    }

    #[test]
    fn test_init_template_matches_defaults() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{DEFAULT_CONFIG_TEMPLATE}").unwrap();
        let config =
            load_config_with_env(temp_file.path().to_str(), true, no_env()).unwrap();
        assert_eq!(config, ServerConfig::default());
    }
}
