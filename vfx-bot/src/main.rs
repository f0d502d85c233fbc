//! vfx-bot - Telegram voice effects bot
//!
//! Long-polls the Bot API, applies ffmpeg effects to voice messages and
//! serves a small status page.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vfx_bot::media::FfmpegInvoker;
use vfx_bot::scratch::ScratchDir;
use vfx_bot::telegram::TelegramClient;
use vfx_bot::{build_router, poller, AppState, Bot};
use vfx_common::config::{self, BotConfig, ConfigOverrides};
use vfx_common::{EffectCatalog, SessionStore};

/// Extra time given to in-flight updates after the transform timeout
const DRAIN_GRACE: Duration = Duration::from_secs(10);

/// Command-line arguments for vfx-bot
#[derive(Parser, Debug)]
#[command(name = "vfx-bot")]
#[command(about = "Telegram bot applying voice effects with ffmpeg")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/vfx-bot/config.toml)
    #[arg(short, long, env = "VFX_CONFIG")]
    config: Option<PathBuf>,

    /// Scratch directory for audio files
    #[arg(long, env = "VFX_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, env = "VFX_FFMPEG")]
    ffmpeg: Option<PathBuf>,

    /// Status page port
    #[arg(short = 'p', long, env = "VFX_STATUS_PORT")]
    status_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "VFX_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(config::default_config_path)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    // Read before tracing is initialized; the log level may come from the file
    let config_found = config_path.exists();
    let toml_config = config::load_toml_config(&config_path).context("Failed to load configuration")?;
    let config = BotConfig::resolve(
        toml_config,
        ConfigOverrides {
            scratch_dir: args.scratch_dir,
            ffmpeg_path: args.ffmpeg,
            status_port: args.status_port,
            log_level: args.log_level,
        },
    )
    .context("Invalid configuration")?;

    let level = &config.log_level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("vfx_bot={level},vfx_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting vfx-bot v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if config_found {
        info!("Configuration file: {}", config_path.display());
    } else {
        warn!("Config file {} not found, using defaults", config_path.display());
    }

    let token = config::bot_token_from_env().context("Bot token missing")?;

    let catalog = Arc::new(EffectCatalog::builtin().context("Invalid effect catalog")?);
    info!(
        "Loaded {} effects ({} pages of {})",
        catalog.len(),
        catalog.total_pages(config.page_size),
        config.page_size
    );

    let scratch = ScratchDir::prepare(&config.scratch_dir)
        .await
        .context("Scratch directory unusable")?;

    let invoker = FfmpegInvoker::new(&config.ffmpeg_path, config.transform_timeout);
    match invoker.probe_version().await {
        Some(version) => info!("✓ {}", version),
        None => warn!(
            "ffmpeg not runnable at {}; effects will fail until it is installed",
            config.ffmpeg_path.display()
        ),
    }

    let client = TelegramClient::new(&token).context("Failed to create Telegram client")?;
    let sessions = Arc::new(SessionStore::new());
    let bot = Arc::new(Bot::new(
        client,
        invoker,
        Arc::clone(&catalog),
        Arc::clone(&sessions),
        scratch,
        config.page_size,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Status page
    let app = build_router(AppState::new(sessions, catalog.len(), config.page_size));
    let addr = config.status_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind status page to {}", addr))?;
    info!("Status page listening on http://{}", addr);

    let mut server_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await;
        if let Err(e) = result {
            error!("Status server error: {}", e);
        }
    });

    let poller = tokio::spawn(poller::run(
        bot,
        config.poll_timeout,
        config.transform_timeout + DRAIN_GRACE,
        shutdown_rx,
    ));

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    if let Err(e) = poller.await {
        error!("Poller task failed: {}", e);
    }
    if let Err(e) = server.await {
        error!("Status server task failed: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
