//! JSON REST API for opsboard.
//!
//! Exposes an axum [`Router`] backed by any
//! [`opsboard_core::store::IncidentStore`] and any
//! [`opsboard_events::EventBus`]. Transport concerns beyond permissive CORS
//! are the caller's responsibility.
//!
//! Every response, success or failure, is a JSON envelope carrying either a
//! `data` or an `error` member plus a `timestamp`.

pub mod error;
pub mod incidents;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  http::StatusCode,
  response::IntoResponse,
  routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use opsboard_core::store::IncidentStore;
use opsboard_events::EventBus;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `OPSBOARD_*` environment overrides. Every field has a default so the
/// server starts with no config file at all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  /// Base URL of the dashboard UI, used for notification title links.
  pub dashboard_url:   String,
  /// Name of the environment variable holding the chat webhook URL. The
  /// variable is read at dispatch time, not at startup.
  pub webhook_url_env: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:            "127.0.0.1".to_owned(),
      port:            8080,
      store_path:      PathBuf::from("opsboard.db"),
      dashboard_url:   "http://localhost:8080".to_owned(),
      webhook_url_env: "OPSBOARD_SLACK_WEBHOOK_URL".to_owned(),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, B> {
  pub store: Arc<S>,
  pub bus:   Arc<B>,
}

// Manual impl: `Arc` fields are always cloneable, no `S: Clone` needed.
impl<S, B> Clone for AppState<S, B> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), bus: self.bus.clone() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router.
///
/// The `/test-incidents` tree mirrors `/incidents` with event publishing
/// suppressed. Unknown routes get a 404 envelope; a known route with the
/// wrong method gets axum's 405.
pub fn router<S, B>(state: AppState<S, B>) -> Router
where
  S: IncidentStore + 'static,
  B: EventBus + 'static,
{
  Router::new()
    .route("/health", get(health))
    .route(
      "/incidents",
      get(incidents::list::<S, B>).post(incidents::create::<S, B>),
    )
    .route("/incidents/stats", get(incidents::stats::<S, B>))
    .route(
      "/incidents/{id}",
      get(incidents::get_one::<S, B>).put(incidents::update_one::<S, B>),
    )
    .route(
      "/test-incidents",
      get(incidents::list::<S, B>).post(incidents::create_test::<S, B>),
    )
    .route("/test-incidents/stats", get(incidents::stats::<S, B>))
    .route(
      "/test-incidents/{id}",
      get(incidents::get_one::<S, B>).put(incidents::update_test::<S, B>),
    )
    .fallback(unknown_route)
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Wrap `data` in the standard response envelope.
pub(crate) fn respond(
  status: StatusCode,
  data: serde_json::Value,
) -> (StatusCode, Json<serde_json::Value>) {
  (status, Json(json!({ "data": data, "timestamp": Utc::now() })))
}

/// `GET /health` — liveness probe.
async fn health() -> impl IntoResponse {
  respond(
    StatusCode::OK,
    json!({
      "status": "healthy",
      "version": env!("CARGO_PKG_VERSION"),
    }),
  )
}

async fn unknown_route() -> ApiError {
  ApiError::NotFound("endpoint not found".to_owned())
}

// ─── Integration tests ───────────────────────────────────────────────────────
