//! Campus ledger server binary.
//!
//! Serves the referral ledger and refresh token session API over HTTP and runs
//! the expiry sweep in the background.
//!
//! # Usage
//!
//! ```bash
//! # Ephemeral instance on localhost
//! campus-ledger
//!
//! # Persistent instance with a settings file
//! campus-ledger --listen 0.0.0.0:8080 --data /var/lib/campus-ledger --config ledger.toml
//!
//! # Environment variables
//! CAMPUS__LEDGER__LISTEN=0.0.0.0:8080 \
//! CAMPUS__LEDGER__DATA=/var/lib/campus-ledger \
//! CAMPUS__LEDGER__REFERRAL__PREMIUM_UNLOCK_THRESHOLD=5 \
//! campus-ledger
//! ```

use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::Path;

use campus_ledger_server::config::{
    self, Cli, CliCommand, Config, ConfigAction, ConfigError, LedgerSettings, LogFormat,
};
use campus_ledger_server::shutdown::{self, ShutdownCoordinator};
use campus_ledger_server::{AppState, build_router};
use campus_ledger_state::ExpirySweeper;
use campus_ledger_state::metrics::LATENCY_HISTOGRAM_BUCKETS;
use campus_ledger_storage::{StorageEngine, StorageError};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use snafu::{ResultExt, Snafu};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File name of the ledger database inside the data directory.
const DATABASE_FILE: &str = "ledger.redb";

/// Top-level error type for the server binary.
#[derive(Debug, Snafu)]
enum ServerError {
    #[snafu(display("configuration error: {source}"))]
    Config { source: ConfigError },

    #[snafu(display("failed to open ledger database: {source}"))]
    Storage { source: StorageError },

    #[snafu(display("failed to start metrics exporter: {message}"))]
    Metrics { message: String },

    #[snafu(display("failed to bind {addr}: {source}"))]
    Bind { addr: SocketAddr, source: std::io::Error },

    #[snafu(display("server error: {source}"))]
    Serve { source: std::io::Error },
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Parse CLI args and env vars (clap handles --help and --version)
    let cli = Cli::parse();

    if let Some(CliCommand::Config { action: ConfigAction::Schema }) = cli.command {
        print!("{}", config::generate_config_schema());
        return Ok(());
    }

    let config = cli.config;
    init_logging(&config);

    let settings = LedgerSettings::load(config.config_file.as_deref()).context(ConfigSnafu)?;
    let data_dir = config.resolve_data_dir().context(ConfigSnafu)?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %data_dir.display(),
        premium_unlock_threshold = settings.referral.premium_unlock_threshold,
        token_ttl = ?settings.session.token_ttl,
        "Starting Campus ledger"
    );

    if config.is_localhost_only() {
        tracing::warn!(
            "Listening on localhost only. Remote connections will be rejected. \
             Set --listen or CAMPUS__LEDGER__LISTEN to accept remote connections."
        );
    }

    if config.is_ephemeral() {
        tracing::warn!(
            data_dir = %data_dir.display(),
            "Running in ephemeral mode. All data will be lost on shutdown. \
             Set --data or CAMPUS__LEDGER__DATA for persistent storage."
        );
    }

    let result = serve(&config, settings, &data_dir).await;
    // Before propagating: a failed start must not leave temp data behind.
    config.remove_ephemeral_data(&data_dir);
    result?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Opens the store and serves until a shutdown signal, then stops the sweeper.
async fn serve(
    config: &Config,
    settings: LedgerSettings,
    data_dir: &Path,
) -> Result<(), ServerError> {
    if let Some(metrics_addr) = config.metrics_addr {
        init_metrics_exporter(metrics_addr)?;
    }

    let engine = StorageEngine::open(data_dir.join(DATABASE_FILE)).context(StorageSnafu)?;

    let coordinator = ShutdownCoordinator::new();
    let sweeper = ExpirySweeper::new(engine.clone(), &settings.session).start(coordinator.subscribe());

    let state = AppState::new(engine, settings.referral, settings.session);
    let app = build_router(state);

    let server_result = async {
        let listener = tokio::net::TcpListener::bind(config.listen_addr)
            .await
            .context(BindSnafu { addr: config.listen_addr })?;
        tracing::info!("Server ready, accepting connections");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::shutdown_signal())
            .await
            .context(ServeSnafu)
    }
    .await;

    coordinator.shutdown();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Expiry sweeper did not stop cleanly");
    }

    server_result
}

/// Initializes the logging system based on configuration.
///
/// Supports three formats:
/// - `Text`: Human-readable format (development)
/// - `Json`: JSON structured logging (production)
/// - `Auto`: JSON for non-TTY stdout, text otherwise
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match config.log_format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stdout().is_terminal(),
    };

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init();
    } else {
        tracing_subscriber::registry().with(env_filter).with(fmt::layer()).init();
    }
}

/// Initializes the Prometheus metrics exporter.
///
/// Starts an HTTP server that exposes metrics at `/metrics`.
fn init_metrics_exporter(addr: SocketAddr) -> Result<(), ServerError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(&LATENCY_HISTOGRAM_BUCKETS)
        .map_err(|e| ServerError::Metrics { message: e.to_string() })?
        .install()
        .map_err(|e| ServerError::Metrics { message: e.to_string() })?;

    tracing::info!(metrics_addr = %addr, "Prometheus metrics exporter started");
    Ok(())
}
