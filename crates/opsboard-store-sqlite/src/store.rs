//! [`SqliteStore`] — the SQLite implementation of [`IncidentStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use opsboard_core::{
  incident::{Incident, IncidentPatch, NewIncident},
  lifecycle::{IncidentStats, compute_stats},
  store::{IncidentQuery, IncidentStore},
};

use crate::{
  Error, Result,
  encode::{
    INCIDENT_COLUMNS, RawIncident, encode_dt, encode_metadata, encode_tags,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An incident store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_one(&self, incident_id: String) -> Result<Option<Incident>> {
    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "SELECT {INCIDENT_COLUMNS} FROM incidents \
               WHERE incident_id = ?1"
            ),
            rusqlite::params![incident_id],
            RawIncident::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawIncident::decode).transpose()
  }
}

// ─── Trait implementation ────────────────────────────────────────────────────

impl IncidentStore for SqliteStore {
  type Error = Error;

  async fn create(&self, incident: NewIncident) -> Result<Incident> {
    let now = Utc::now();

    let stored = Incident {
      incident_id: incident.incident_id,
      title:       incident.title,
      description: incident.description,
      severity:    incident.severity,
      status:      incident.status,
      service:     incident.service,
      source:      incident.source,
      timestamp:   incident.timestamp,
      assigned_to: incident.assigned_to,
      tags:        incident.tags,
      metadata:    incident.metadata,
      created_at:  now,
      updated_at:  now,
      resolved_at: None,
    };

    let incident_id = stored.incident_id.clone();
    let title       = stored.title.clone();
    let description = stored.description.clone();
    let severity    = stored.severity.as_str();
    let status      = stored.status.as_str();
    let service     = stored.service.clone();
    let source      = stored.source.clone();
    let timestamp   = encode_dt(stored.timestamp);
    let assigned_to = stored.assigned_to.clone();
    let tags        = encode_tags(&stored.tags)?;
    let metadata    = encode_metadata(stored.metadata.as_ref())?;
    let stamp       = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO incidents (
             incident_id, title, description, severity, status,
             service, source, timestamp, assigned_to, tags,
             metadata, created_at, updated_at, resolved_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, NULL)",
          rusqlite::params![
            incident_id,
            title,
            description,
            severity,
            status,
            service,
            source,
            timestamp,
            assigned_to,
            tags,
            metadata,
            stamp,
            stamp,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(stored)
  }

  async fn get(&self, incident_id: &str) -> Result<Option<Incident>> {
    self.fetch_one(incident_id.to_owned()).await
  }

  async fn update(
    &self,
    incident_id: &str,
    patch: IncidentPatch,
  ) -> Result<Option<Incident>> {
    // Assemble the dynamic SET clause. Every value binds as TEXT or NULL.
    let mut columns: Vec<&'static str> = Vec::new();
    let mut values: Vec<Option<String>> = Vec::new();

    if let Some(title) = patch.title {
      columns.push("title");
      values.push(Some(title));
    }
    if let Some(description) = patch.description {
      columns.push("description");
      values.push(Some(description));
    }
    if let Some(severity) = patch.severity {
      columns.push("severity");
      values.push(Some(severity.as_str().to_owned()));
    }
    if let Some(status) = patch.status {
      columns.push("status");
      values.push(Some(status.as_str().to_owned()));
    }
    if let Some(assigned_to) = patch.assigned_to {
      columns.push("assigned_to");
      values.push(Some(assigned_to));
    }
    if let Some(tags) = patch.tags {
      columns.push("tags");
      values.push(Some(encode_tags(&tags)?));
    }
    if let Some(resolved_at) = patch.resolved_at {
      columns.push("resolved_at");
      values.push(resolved_at.map(encode_dt));
    }

    // updated_at is refreshed on every mutation, even an all-empty patch.
    columns.push("updated_at");
    values.push(Some(encode_dt(Utc::now())));

    let assignments = columns
      .iter()
      .enumerate()
      .map(|(i, col)| format!("{col} = ?{}", i + 1))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "UPDATE incidents SET {assignments} WHERE incident_id = ?{}",
      columns.len() + 1
    );
    values.push(Some(incident_id.to_owned()));

    let changed = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(changed)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.fetch_one(incident_id.to_owned()).await
  }

  async fn list(&self, query: &IncidentQuery) -> Result<Vec<Incident>> {
    let limit = query.effective_limit() as i64;

    // Status takes priority over severity when both filters are present;
    // see `IncidentQuery`.
    let (sql, filter) = if let Some(status) = query.status {
      (
        format!(
          "SELECT {INCIDENT_COLUMNS} FROM incidents \
           WHERE status = ?1 ORDER BY timestamp DESC LIMIT ?2"
        ),
        Some(status.as_str().to_owned()),
      )
    } else if let Some(severity) = query.severity {
      (
        format!(
          "SELECT {INCIDENT_COLUMNS} FROM incidents \
           WHERE severity = ?1 ORDER BY timestamp DESC LIMIT ?2"
        ),
        Some(severity.as_str().to_owned()),
      )
    } else {
      (
        format!("SELECT {INCIDENT_COLUMNS} FROM incidents LIMIT ?1"),
        None,
      )
    };

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match &filter {
          Some(value) => stmt
            .query_map(rusqlite::params![value, limit], RawIncident::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map(rusqlite::params![limit], RawIncident::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIncident::decode).collect()
  }

  async fn stats(&self) -> Result<IncidentStats> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT status, severity FROM incidents")?;
        let rows = stmt
          .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(compute_stats(rows))
  }
}
