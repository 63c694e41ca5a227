#![forbid(unsafe_code)]

//! `ota-relay` — OTA bundle admin server binary.
//!
//! Loads configuration and secrets, opens the bundle database, and serves
//! the HTTP API until ctrl-c or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use ota_relay::config::GlobalConfig;
use ota_relay::http::{server, AppState};
use ota_relay::persistence::db;
use ota_relay::persistence::settings_repo::SettingsRepo;
use ota_relay::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "ota-relay", about = "OTA update bundle admin server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("ota-relay server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = match args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    config.apply_env_overrides()?;
    config.load_credentials().await?;
    info!(
        host = %config.host,
        port = config.port,
        bucket = ?config.storage.bucket,
        "configuration loaded"
    );
    let config = Arc::new(config);

    // ── Initialize database ─────────────────────────────
    let db = Arc::new(db::connect(&config.database_url).await?);
    let schema_version = SettingsRepo::new(Arc::clone(&db)).schema_version().await?;
    info!(%schema_version, "database connected");

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        db,
    });

    // ── Serve until shutdown ────────────────────────────
    let ct = CancellationToken::new();
    let server_ct = ct.clone();
    let mut server_handle = tokio::spawn(async move { server::serve(state, server_ct).await });

    let joined = tokio::select! {
        () = shutdown_signal() => {
            info!("shutdown signal received");
            ct.cancel();
            server_handle.await
        }
        joined = &mut server_handle => joined,
    };
    joined.map_err(|err| AppError::Http(format!("server task panicked: {err}")))??;

    info!("ota-relay shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
