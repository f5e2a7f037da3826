//! Incident — the sole entity tracked by opsboard.
//!
//! Field names serialise as camelCase to match the public API surface
//! (`incidentId`, `assignedTo`, `resolvedAt`, ...).

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

// ─── Enums ───────────────────────────────────────────────────────────────────

/// How bad the incident is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
  Critical,
  High,
  Medium,
  Low,
}

impl Severity {
  pub const ALL: [Severity; 4] =
    [Self::Critical, Self::High, Self::Medium, Self::Low];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Critical => "Critical",
      Self::High => "High",
      Self::Medium => "Medium",
      Self::Low => "Low",
    }
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Severity {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Error> {
    match s {
      "Critical" => Ok(Self::Critical),
      "High" => Ok(Self::High),
      "Medium" => Ok(Self::Medium),
      "Low" => Ok(Self::Low),
      other => Err(Error::UnknownSeverity(other.to_owned())),
    }
  }
}

/// Where the incident sits in its lifecycle. `Resolved` is not terminal —
/// an incident can be reopened by a later status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
  New,
  Acknowledged,
  InProgress,
  Resolved,
}

impl Status {
  pub const ALL: [Status; 4] =
    [Self::New, Self::Acknowledged, Self::InProgress, Self::Resolved];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::New => "New",
      Self::Acknowledged => "Acknowledged",
      Self::InProgress => "InProgress",
      Self::Resolved => "Resolved",
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Status {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Error> {
    match s {
      "New" => Ok(Self::New),
      "Acknowledged" => Ok(Self::Acknowledged),
      "InProgress" => Ok(Self::InProgress),
      "Resolved" => Ok(Self::Resolved),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

// ─── Incident ────────────────────────────────────────────────────────────────

/// A tracked operational issue.
///
/// `incident_id` is assigned exactly once, at creation. `created_at` and
/// `updated_at` are stamped by the store; `updated_at` is refreshed on every
/// mutation. `resolved_at` is derived from status transitions, never free-set
/// alongside a status change (see [`crate::lifecycle::apply_update_policy`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
  pub incident_id: String,
  pub title:       String,
  pub description: String,
  pub severity:    Severity,
  pub status:      Status,
  /// Free-text identifier of the affected system.
  pub service:     String,
  /// Provenance tag, e.g. "manual", "cloudwatch", "health-check".
  pub source:      String,
  /// Creation time; immutable.
  pub timestamp:   DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assigned_to: Option<String>,
  /// Ordered; duplicates are allowed at the API boundary.
  pub tags:        Vec<String>,
  /// Free-form provenance details (alarm ARN, thresholds, ...). Opaque to
  /// core logic, passed through unmodified.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub metadata:    Option<serde_json::Value>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resolved_at: Option<DateTime<Utc>>,
}

// ─── NewIncident ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::IncidentStore::create`].
/// `created_at`/`updated_at` are always set by the store; they are not
/// accepted from callers.
#[derive(Debug, Clone)]
pub struct NewIncident {
  pub incident_id: String,
  pub title:       String,
  pub description: String,
  pub severity:    Severity,
  pub status:      Status,
  pub service:     String,
  pub source:      String,
  pub timestamp:   DateTime<Utc>,
  pub assigned_to: Option<String>,
  pub tags:        Vec<String>,
  pub metadata:    Option<serde_json::Value>,
}

// ─── IncidentPatch ───────────────────────────────────────────────────────────

/// A sparse field-level merge applied by
/// [`crate::store::IncidentStore::update`]. Absent fields are left untouched;
/// `updated_at` is always refreshed.
///
/// `resolved_at` is tri-state: `None` = leave alone, `Some(Some(t))` = set,
/// `Some(None)` = clear.
#[derive(Debug, Clone, Default)]
pub struct IncidentPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub severity:    Option<Severity>,
  pub status:      Option<Status>,
  pub assigned_to: Option<String>,
  pub tags:        Option<Vec<String>>,
  pub resolved_at: Option<Option<DateTime<Utc>>>,
}

impl IncidentPatch {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.severity.is_none()
      && self.status.is_none()
      && self.assigned_to.is_none()
      && self.tags.is_none()
      && self.resolved_at.is_none()
  }
}

// ─── UpdateRequest ───────────────────────────────────────────────────────────

/// The allow-listed mutable fields accepted by the update endpoints. Unknown
/// fields in the request body are silently dropped by deserialisation, which
/// is the whole field filter.
///
/// Unlike creation, enum fields here are not run through the validator — a
/// malformed `severity`/`status` fails JSON deserialisation instead.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateRequest {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub severity:    Option<Severity>,
  pub status:      Option<Status>,
  pub assigned_to: Option<String>,
  pub tags:        Option<Vec<String>>,
  pub resolved_at: Option<DateTime<Utc>>,
}

impl UpdateRequest {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.severity.is_none()
      && self.status.is_none()
      && self.assigned_to.is_none()
      && self.tags.is_none()
      && self.resolved_at.is_none()
  }
}

/// Event-path conversion: the embedded partial update from an
/// "Incident Updated" event is applied as-is, with no `resolved_at`
/// re-derivation. The upstream publisher already ran the update policy.
impl From<UpdateRequest> for IncidentPatch {
  fn from(r: UpdateRequest) -> Self {
    IncidentPatch {
      title:       r.title,
      description: r.description,
      severity:    r.severity,
      status:      r.status,
      assigned_to: r.assigned_to,
      tags:        r.tags,
      resolved_at: r.resolved_at.map(Some),
    }
  }
}

// ─── IncidentDraft ───────────────────────────────────────────────────────────

/// Raw, not-yet-validated creation input. Enum fields are plain strings here
/// so the validator can report bad values instead of failing at the JSON
/// layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IncidentDraft {
  /// Honoured when present (event ingestion persists embedded ids verbatim);
  /// generated otherwise.
  pub incident_id: Option<String>,
  pub title:       Option<String>,
  pub description: Option<String>,
  pub severity:    Option<String>,
  pub status:      Option<String>,
  pub service:     Option<String>,
  pub source:      Option<String>,
  pub timestamp:   Option<DateTime<Utc>>,
  pub assigned_to: Option<String>,
  pub tags:        Option<Vec<String>>,
  pub metadata:    Option<serde_json::Value>,
}
