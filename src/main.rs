//! Helloworld: a sample service for orchestration demos.
//!
//! This is the application entry point. It resolves configuration from the
//! environment (and an optional TOML file), initializes tracing, sets up the
//! Axum router, and starts the HTTP server.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use helloworld::config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER};
use helloworld::http::start_server;
use helloworld::routes::create_router;
use helloworld::state::AppState;

/// Helloworld: reports its version and container, and answers liveness probes
#[derive(Parser, Debug)]
#[command(name = "helloworld", version, about)]
struct Args {
    /// Optional configuration file; environment variables override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "helloworld=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

fn init_tracing(filter: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(EnvFilter::new(filter));

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Configuration comes first: a missing port must stop us before any socket is opened
    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("helloworld: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    init_tracing(&log_filter, config.logging.format);

    tracing::info!(
        name = %config.service.identity.name,
        version = %config.service.identity.version(),
        container = %config.service.host_identifier(),
        port = config.http.port,
        "Loaded configuration"
    );

    let state = AppState::new(config.clone());
    let app = create_router(state);

    if let Err(e) = start_server(app, &config).await {
        tracing::error!(error = %e, "Server failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
