//! Telephony-to-LLM voice bridge gateway binary.

mod bridge;
mod llm;
mod state;
mod telephony;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use voice_booking::{BookingStore, ToolDispatcher};
use voice_domain::config::{Config, ConfigSeverity};
use voice_domain::session_cache::ChannelSessionCache;

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "voice-bridge-gateway", about = "Telephony-to-LLM voice bridge")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config).context("loading configuration")?;
    config.apply_env_overrides();

    init_tracing(&config.log.level);

    run_server(Arc::new(config)).await
}

/// `RUST_LOG` always wins; otherwise falls back to `config.log.level`
/// (the `LOG_LEVEL` env key, via `Config::apply_env_overrides`) for the
/// gateway's own target and `info` everywhere else.
fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("info,voice_gateway={level}"))),
        )
        .json()
        .init();
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("voice bridge gateway starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let store = BookingStore::connect(&config.booking.database_path)
        .await
        .context("opening booking store")?;
    let dispatcher = Arc::new(ToolDispatcher::new(store));

    let session_cache = Arc::new(ChannelSessionCache::spawn(
        config.session_cache.url.clone(),
        config.session_cache.channel_capacity,
    ));

    let state = AppState {
        config: config.clone(),
        dispatcher,
        session_cache,
    };

    let app = Router::new()
        .route("/media-stream", get(telephony::media_stream))
        .route("/healthz", get(telephony::healthz))
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
