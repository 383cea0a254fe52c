#![forbid(unsafe_code)]

//! `chat-herald`: live chat announcer server binary.
//!
//! Bootstraps configuration, builds the reply pipeline, starts the HTTP /
//! WebSocket surface and the IPC server for `chat-herald-ctl`, and
//! optionally begins monitoring a token straight away.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use chat_herald::http::server;
use chat_herald::ipc::server::{spawn_ipc_server, IPC_TOKEN_ENV};
use chat_herald::monitor::{Monitor, PipelineParts};
use chat_herald::speech::observers::ObserverHub;
use chat_herald::{AppError, GlobalConfig, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "chat-herald", about = "Live chat announcer", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Start monitoring this token address immediately.
    #[arg(long)]
    token: Option<String>,

    /// Display name for `--token`.
    #[arg(long, requires = "token")]
    token_name: Option<String>,

    /// Override the HTTP listen port.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("chat-herald server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = match args.config {
        Some(ref path) => GlobalConfig::load_from_path(path)?,
        None => {
            info!("no config file given; using defaults");
            GlobalConfig::default()
        }
    };
    if let Some(port) = args.port {
        config.http.port = port;
    }
    config.load_credentials().await?;

    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Build the pipeline ──────────────────────────────
    let ct = CancellationToken::new();
    let parts = PipelineParts::from_config(&config, ObserverHub::default())?;
    let monitor = Arc::new(Monitor::new(Arc::clone(&config), parts, ct.clone()));

    // ── Start transports ────────────────────────────────
    let listener = server::bind(&config.http).await?;
    let http_ct = ct.clone();
    let http_monitor = Arc::clone(&monitor);
    let http_config = Arc::clone(&config);
    let http_handle = tokio::spawn(async move {
        if let Err(err) = server::serve(listener, http_monitor, &http_config.http, http_ct).await {
            error!(%err, "http transport failed");
        }
    });

    let ipc_token = std::env::var(IPC_TOKEN_ENV).ok().filter(|t| !t.is_empty());
    let ipc_handle = spawn_ipc_server(
        Arc::clone(&monitor),
        &config.ipc_name,
        ipc_token,
        ct.clone(),
    )?;

    if let Some(ref token) = args.token {
        let report = monitor.start(token, args.token_name.as_deref()).await?;
        info!(token = ?report.token_address, "monitoring started from command line");
    }

    info!("chat-herald ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");

    monitor.shutdown().await;
    ct.cancel();

    // ── Wait for background tasks ───────────────────────
    let _ = tokio::join!(http_handle, ipc_handle);
    info!("chat-herald shut down");

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
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
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
