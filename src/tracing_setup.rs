use std::net::SocketAddr;

use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{config::models::LogConfig, server::state::ProtocolKind};

/// Initialize logging. `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .wrap_err_with(|| format!("Invalid log level: {}", config.level))?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if config.json {
        Registry::default()
            .with(env_filter)
            .with(
                fmt_layer
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
            .wrap_err("Failed to install JSON tracing subscriber")?;
    } else {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.pretty().with_ansi(true))
            .try_init()
            .wrap_err("Failed to install console tracing subscriber")?;
    }

    tracing::info!(level = %config.level, json = config.json, "recordgate logging initialized");
    Ok(())
}

/// Span wrapping one listener's background task.
pub fn listener_span(protocol: ProtocolKind, address: SocketAddr) -> tracing::Span {
    tracing::info_span!("listener", %protocol, %address)
}
