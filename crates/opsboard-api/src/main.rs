//! opsboard server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the incident API over HTTP. Lifecycle
//! events flow through an in-process bus into the event router and the
//! Slack notifier.

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use opsboard_api::{AppState, ServerConfig};
use opsboard_events::{EventRouter, LocalBus};
use opsboard_notify::{EnvWebhookSource, Notifier};
use opsboard_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "opsboard incident API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("OPSBOARD"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open SQLite store.
  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", server_cfg.store_path)
    })?;
  let store = Arc::new(store);

  // Wire the notification pipeline: router → notifier, fed by the bus.
  let notifier = Notifier::new(
    EnvWebhookSource::new(&server_cfg.webhook_url_env),
    &server_cfg.dashboard_url,
  )
  .context("failed to build notifier")?;
  let router = Arc::new(EventRouter::new(store.clone()));
  let bus = Arc::new(LocalBus::new(router, notifier));

  let state = AppState { store, bus };
  let app = opsboard_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
