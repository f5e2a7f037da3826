//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Tags and metadata are
//! stored as compact JSON. Severity and status are stored as their canonical
//! display names so the stats scan can fold raw text without decoding full
//! records.

use chrono::{DateTime, Utc};
use opsboard_core::incident::Incident;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Tags and metadata ───────────────────────────────────────────────────────

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_metadata(
  metadata: Option<&serde_json::Value>,
) -> Result<Option<String>> {
  metadata
    .map(|m| serde_json::to_string(m).map_err(Error::Json))
    .transpose()
}

// ─── Row shape ───────────────────────────────────────────────────────────────

/// An incident row as read from SQLite, before any decoding. Kept as plain
/// text so it can cross the `tokio_rusqlite` closure boundary and be decoded
/// with this crate's error type on the caller's side.
pub struct RawIncident {
  pub incident_id: String,
  pub title:       String,
  pub description: String,
  pub severity:    String,
  pub status:      String,
  pub service:     String,
  pub source:      String,
  pub timestamp:   String,
  pub assigned_to: Option<String>,
  pub tags:        String,
  pub metadata:    Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
  pub resolved_at: Option<String>,
}

/// Column list matching [`RawIncident::from_row`]'s positional reads.
pub const INCIDENT_COLUMNS: &str = "incident_id, title, description, \
   severity, status, service, source, timestamp, assigned_to, tags, \
   metadata, created_at, updated_at, resolved_at";

impl RawIncident {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      incident_id: row.get(0)?,
      title:       row.get(1)?,
      description: row.get(2)?,
      severity:    row.get(3)?,
      status:      row.get(4)?,
      service:     row.get(5)?,
      source:      row.get(6)?,
      timestamp:   row.get(7)?,
      assigned_to: row.get(8)?,
      tags:        row.get(9)?,
      metadata:    row.get(10)?,
      created_at:  row.get(11)?,
      updated_at:  row.get(12)?,
      resolved_at: row.get(13)?,
    })
  }

  pub fn decode(self) -> Result<Incident> {
    let metadata = self
      .metadata
      .as_deref()
      .map(serde_json::from_str)
      .transpose()?;

    Ok(Incident {
      incident_id: self.incident_id,
      title:       self.title,
      description: self.description,
      severity:    self.severity.parse().map_err(Error::Core)?,
      status:      self.status.parse().map_err(Error::Core)?,
      service:     self.service,
      source:      self.source,
      timestamp:   decode_dt(&self.timestamp)?,
      assigned_to: self.assigned_to,
      tags:        decode_tags(&self.tags)?,
      metadata,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
      resolved_at: self.resolved_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
