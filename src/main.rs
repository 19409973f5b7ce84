use std::{path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use recordgate::{
    adapters::{MemoryRecordStore, RecordHandler},
    config::{ServerConfig, ServerConfigValidator, load_config, loader::DEFAULT_CONFIG_TEMPLATE},
    core::RecordService,
    metrics::{self, MetricsSink, NoopSink, PrometheusSink},
    server::Coordinator,
    tracing_setup,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Start the gRPC and HTTP listeners (default)
    Serve {
        /// Configuration file to use; a missing file means built-in defaults
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config),
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::Serve { config }) => serve(&config).await,
        None => serve(&args.config).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let config: ServerConfig = load_config(Some(config_path), false)
        .with_context(|| format!("Failed to load configuration from {config_path}"))?;
    ServerConfigValidator::validate(&config)
        .map_err(|e| eyre!("Invalid configuration in {config_path}: {e}"))?;

    tracing_setup::init_tracing(&config.log).context("Failed to initialize tracing")?;
    tracing::info!(
        "Loaded configuration from {config_path} (environment: {})",
        config.environment
    );

    let prometheus = if config.metrics.enabled {
        Some(metrics::install_prometheus().context("Failed to install Prometheus recorder")?)
    } else {
        tracing::info!("Metrics disabled; /metrics will answer 404");
        None
    };
    let sink: Arc<dyn MetricsSink> = if prometheus.is_some() {
        Arc::new(PrometheusSink)
    } else {
        Arc::new(NoopSink)
    };

    let store = Arc::new(MemoryRecordStore::new());
    let handler = Arc::new(RecordHandler::new(RecordService::new(store)));

    let mut coordinator = Coordinator::new(config, handler, sink);
    if let Some(handle) = prometheus {
        coordinator = coordinator.with_prometheus(handle);
    }

    let running = coordinator
        .start()
        .await
        .context("Failed to start listeners")?;
    println!(
        "recordgate listening: HTTP on {}, gRPC on {}",
        running.http_addr(),
        running.rpc_addr()
    );

    let report = running.run_until_shutdown().await;
    if report.is_failure() {
        return Err(eyre!(
            "Shutdown after failure ({}): http {}, rpc {}",
            report.reason,
            report.http,
            report.rpc
        ));
    }
    Ok(())
}

/// Validate configuration file and exit
fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(Some(config_path), true) {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    match ServerConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Environment: {}", config.environment);
            println!("   • HTTP gateway: {}:{}", config.host, config.http_port);
            println!("   • gRPC: {}:{}", config.host, config.rpc_port);
            println!("   • Shutdown grace: {}s", config.shutdown_grace_secs);
            println!("   • Metrics: {}", config.metrics.enabled);
            println!("   • gRPC reflection: {}", config.rpc.reflection);
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Use an IP address for host (e.g. '0.0.0.0' or '::1')");
            println!("   • Give http_port and rpc_port different values");
            println!("   • Keep shutdown_grace_secs and request_timeout_secs above zero");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    tokio::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'recordgate serve --config {config_path}' to start the server");
    Ok(())
}
