//! Incident lifecycle logic: id generation, creation defaults, the update
//! allow-list policy, and stats aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  incident::{
    IncidentDraft, IncidentPatch, NewIncident, Status, UpdateRequest,
  },
};

// ─── Id generation ───────────────────────────────────────────────────────────

const ID_PREFIX: &str = "INC";
const SUFFIX_LEN: usize = 6;
const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Produce a new incident id of the form `INC-<YYYYMMDD>-<6 alnum>`.
///
/// Collision-resistant enough for expected incident volume, not globally
/// unique — the single-writer assumption holds upstream.
pub fn generate_id() -> String {
  let mut bytes = [0u8; SUFFIX_LEN];
  OsRng.fill_bytes(&mut bytes);
  let suffix: String = bytes
    .iter()
    .map(|b| SUFFIX_ALPHABET[*b as usize % SUFFIX_ALPHABET.len()] as char)
    .collect();
  format!("{ID_PREFIX}-{}-{suffix}", Utc::now().format("%Y%m%d"))
}

// ─── Creation ────────────────────────────────────────────────────────────────

/// Fill absent optional fields with their documented defaults. Runs before
/// validation so a minimal `{"title": "..."}` body is a valid creation.
pub fn apply_create_defaults(draft: &mut IncidentDraft) {
  draft.description.get_or_insert_with(String::new);
  draft.severity.get_or_insert_with(|| "Medium".to_owned());
  draft.status.get_or_insert_with(|| "New".to_owned());
  draft.service.get_or_insert_with(|| "custom".to_owned());
  draft.source.get_or_insert_with(|| "manual".to_owned());
  draft.tags.get_or_insert_with(Vec::new);
}

/// Build the persistable record from a defaulted, validated draft.
///
/// The id and creation timestamp are taken from the draft when present
/// (event ingestion persists embedded records verbatim) and derived
/// otherwise. The title is trimmed.
pub fn build_incident(draft: IncidentDraft, now: DateTime<Utc>) -> Result<NewIncident> {
  let title = draft
    .title
    .as_deref()
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| Error::Validation("title is required".to_owned()))?
    .to_owned();

  let severity = draft
    .severity
    .as_deref()
    .unwrap_or("Medium")
    .parse()?;
  let status = draft.status.as_deref().unwrap_or("New").parse()?;

  Ok(NewIncident {
    incident_id: draft.incident_id.unwrap_or_else(generate_id),
    title,
    description: draft.description.unwrap_or_default(),
    severity,
    status,
    service: draft.service.unwrap_or_else(|| "custom".to_owned()),
    source: draft.source.unwrap_or_else(|| "manual".to_owned()),
    timestamp: draft.timestamp.unwrap_or(now),
    assigned_to: draft.assigned_to,
    tags: draft.tags.unwrap_or_default(),
    metadata: draft.metadata,
  })
}

// ─── Update policy ───────────────────────────────────────────────────────────

/// Turn an allow-listed update request into a store patch, deriving
/// `resolved_at` from status transitions:
///
/// - status → `Resolved` without an explicit `resolved_at` stamps `now`;
/// - status → anything else forces `resolved_at` to null, regardless of what
///   was requested;
/// - no status change passes an explicit `resolved_at` through untouched.
///
/// A request that carries no allow-listed field at all is a no-op and is
/// rejected.
pub fn apply_update_policy(
  request: UpdateRequest,
  now: DateTime<Utc>,
) -> Result<IncidentPatch> {
  if request.is_empty() {
    return Err(Error::NoUpdatableFields);
  }

  let resolved_at = match request.status {
    Some(Status::Resolved) => Some(Some(request.resolved_at.unwrap_or(now))),
    Some(_) => Some(None),
    None => request.resolved_at.map(Some),
  };

  Ok(IncidentPatch {
    title:       request.title,
    description: request.description,
    severity:    request.severity,
    status:      request.status,
    assigned_to: request.assigned_to,
    tags:        request.tags,
    resolved_at,
  })
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// Aggregate incident counts, bucketed by status and by severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentStats {
  pub total:       usize,
  pub by_status:   BTreeMap<String, usize>,
  pub by_severity: BTreeMap<String, usize>,
}

/// Single-pass fold over `(status, severity)` projections.
///
/// Values are counted under their literal text — an unrecognised value in
/// the backing table still gets its own bucket rather than being merged into
/// an "unknown" one.
pub fn compute_stats<I, S>(rows: I) -> IncidentStats
where
  I: IntoIterator<Item = (S, S)>,
  S: Into<String>,
{
  let mut stats = IncidentStats {
    total:       0,
    by_status:   BTreeMap::new(),
    by_severity: BTreeMap::new(),
  };

  for (status, severity) in rows {
    stats.total += 1;
    *stats.by_status.entry(status.into()).or_default() += 1;
    *stats.by_severity.entry(severity.into()).or_default() += 1;
  }

  stats
}
