//! Handlers for the `/incidents` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/incidents` | Optional `?status=`, `?severity=`, `?limit=` |
//! | `POST` | `/incidents` | Body: incident fields; 201 + stored record |
//! | `GET`  | `/incidents/stats` | Aggregate counts |
//! | `GET`  | `/incidents/:id` | 404 if not found |
//! | `PUT`  | `/incidents/:id` | Partial update; 400 if no valid fields |
//!
//! Every route exists a second time under `/test-incidents`, which behaves
//! identically but suppresses event publishing — used to verify wiring
//! without spamming the notification channel.
//!
//! Bodies are read as raw bytes and parsed by hand so that malformed JSON
//! yields the standard error envelope instead of axum's plain-text
//! rejection.

use std::str::FromStr;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use opsboard_core::{
  Error as CoreError,
  incident::{Incident, IncidentDraft, Severity, Status, UpdateRequest},
  lifecycle::{apply_create_defaults, apply_update_policy, build_incident},
  store::{IncidentQuery, IncidentStore},
  validate::validate,
};
use opsboard_events::{Event, EventBus, INTERNAL_SOURCE};

use crate::{AppState, error::ApiError, respond};

// ─── List ────────────────────────────────────────────────────────────────────

/// List filters as they arrive on the query string. Kept as plain text and
/// parsed by hand so a bad value yields the standard error envelope instead
/// of axum's plain-text `Query` rejection.
#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub status:   Option<String>,
  pub severity: Option<String>,
  pub limit:    Option<String>,
}

fn parse_list_params(params: ListParams) -> Result<IncidentQuery, ApiError> {
  let status = params
    .status
    .as_deref()
    .map(Status::from_str)
    .transpose()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let severity = params
    .severity
    .as_deref()
    .map(Severity::from_str)
    .transpose()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let limit = params
    .limit
    .as_deref()
    .map(|s| {
      s.parse::<usize>()
        .map_err(|_| ApiError::BadRequest(format!("invalid limit: {s}")))
    })
    .transpose()?;

  Ok(IncidentQuery { status, severity, limit })
}

/// `GET /incidents[?status=...][&severity=...][&limit=...]`
pub async fn list<S, B>(
  State(state): State<AppState<S, B>>,
  Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IncidentStore,
  B: EventBus,
{
  let query = parse_list_params(params)?;

  let incidents = state
    .store
    .list(&query)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  tracing::info!(count = incidents.len(), "listed incidents");

  Ok(respond(
    StatusCode::OK,
    json!({
      "incidents": incidents,
      "count": incidents.len(),
      "filters": {
        "status": query.status.map(Status::as_str),
        "severity": query.severity.map(Severity::as_str),
        "limit": query.effective_limit(),
      },
    }),
  ))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /incidents` — body: incident fields, title required.
pub async fn create<S, B>(
  state: State<AppState<S, B>>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: IncidentStore,
  B: EventBus,
{
  create_inner(state.0, body, false).await
}

/// `POST /test-incidents` — as [`create`], but publishes nothing.
pub async fn create_test<S, B>(
  state: State<AppState<S, B>>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: IncidentStore,
  B: EventBus,
{
  create_inner(state.0, body, true).await
}

async fn create_inner<S, B>(
  state: AppState<S, B>,
  body: Bytes,
  is_test: bool,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError>
where
  S: IncidentStore,
  B: EventBus,
{
  let mut draft: IncidentDraft = parse_body(&body)?;
  // The creation path never honours caller-supplied ids or timestamps;
  // those are only meaningful on the event-ingestion path.
  draft.incident_id = None;
  draft.timestamp = None;

  apply_create_defaults(&mut draft);

  let violations = validate(&draft);
  if !violations.is_empty() {
    return Err(ApiError::Validation(format!(
      "validation errors: {}",
      violations.join(", ")
    )));
  }

  let new_incident =
    build_incident(draft, Utc::now()).map_err(map_core_error)?;
  let incident = state
    .store
    .create(new_incident)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  tracing::info!(
    incident_id = %incident.incident_id,
    severity = %incident.severity,
    "incident created"
  );

  publish_event(&state, "Incident Created", &incident, is_test).await;

  Ok(respond(StatusCode::CREATED, json!(incident)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /incidents/:id`
pub async fn get_one<S, B>(
  State(state): State<AppState<S, B>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IncidentStore,
  B: EventBus,
{
  let incident = state
    .store
    .get(&id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("incident {id} not found")))?;
  Ok(respond(StatusCode::OK, json!(incident)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /incidents/:id` — partial update over the allow-listed fields.
pub async fn update_one<S, B>(
  state: State<AppState<S, B>>,
  id: Path<String>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: IncidentStore,
  B: EventBus,
{
  update_inner(state.0, id.0, body, false).await
}

/// `PUT /test-incidents/:id` — as [`update_one`], but publishes nothing.
pub async fn update_test<S, B>(
  state: State<AppState<S, B>>,
  id: Path<String>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: IncidentStore,
  B: EventBus,
{
  update_inner(state.0, id.0, body, true).await
}

async fn update_inner<S, B>(
  state: AppState<S, B>,
  id: String,
  body: Bytes,
  is_test: bool,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError>
where
  S: IncidentStore,
  B: EventBus,
{
  let request: UpdateRequest = parse_body(&body)?;

  // Existence check up front: the store's update is a blind write.
  state
    .store
    .get(&id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("incident {id} not found")))?;
  let new_status = request.status;

  let patch =
    apply_update_policy(request, Utc::now()).map_err(map_core_error)?;

  let incident = state
    .store
    .update(&id, patch)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("incident {id} not found")))?;

  tracing::info!(incident_id = %id, "incident updated");

  // Only status transitions are significant enough to notify about.
  if let Some(status) = new_status {
    let event_type = if status == Status::Resolved {
      "Incident Resolved"
    } else {
      "Incident Updated"
    };
    publish_event(&state, event_type, &incident, is_test).await;
  }

  Ok(respond(StatusCode::OK, json!(incident)))
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// `GET /incidents/stats`
pub async fn stats<S, B>(
  State(state): State<AppState<S, B>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IncidentStore,
  B: EventBus,
{
  let stats = state
    .store
    .stats()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(respond(StatusCode::OK, json!(stats)))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn parse_body<'a, T: Deserialize<'a>>(body: &'a Bytes) -> Result<T, ApiError> {
  if body.is_empty() {
    return Err(ApiError::BadRequest("request body is required".to_owned()));
  }
  serde_json::from_slice(body)
    .map_err(|_| ApiError::BadRequest("invalid JSON in request body".to_owned()))
}

fn map_core_error(e: CoreError) -> ApiError {
  match e {
    CoreError::NoUpdatableFields => {
      ApiError::BadRequest("no valid fields to update".to_owned())
    }
    CoreError::IncidentNotFound(id) => {
      ApiError::NotFound(format!("incident {id} not found"))
    }
    other => ApiError::Validation(other.to_string()),
  }
}

/// Best-effort publish: a bus failure is logged and never surfaces into the
/// response determined by the persistence step.
async fn publish_event<S, B>(
  state: &AppState<S, B>,
  event_type: &str,
  incident: &Incident,
  is_test: bool,
) where
  S: IncidentStore,
  B: EventBus,
{
  if is_test {
    tracing::info!(
      incident_id = %incident.incident_id,
      event_type,
      "test run; skipping event publish"
    );
    return;
  }

  let detail = match serde_json::to_value(incident) {
    Ok(detail) => detail,
    Err(e) => {
      tracing::error!(error = %e, "failed to serialise incident for publish");
      return;
    }
  };

  let event = Event::new(INTERNAL_SOURCE, event_type, detail);
  if let Err(e) = state.bus.publish(event).await {
    tracing::error!(
      error = %e,
      incident_id = %incident.incident_id,
      event_type,
      "event publish failed"
    );
  }
}
