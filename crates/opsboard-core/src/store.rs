//! The `IncidentStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `opsboard-store-sqlite`). Higher layers (`opsboard-api`,
//! `opsboard-events`) depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use crate::{
  incident::{Incident, IncidentPatch, NewIncident, Severity, Status},
  lifecycle::IncidentStats,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`IncidentStore::list`].
///
/// `status` and `severity` cannot be combined into a single indexed lookup;
/// when both are given, **status wins** and `severity` is ignored. This
/// mirrors the first-checked-wins order of the system this replaces and is a
/// documented decision, not an accident.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncidentQuery {
  pub status:   Option<Status>,
  pub severity: Option<Severity>,
  pub limit:    Option<usize>,
}

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 100;

impl IncidentQuery {
  /// The limit actually applied: defaults to 50, hard-capped at 100.
  pub fn effective_limit(&self) -> usize {
    self.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an incident store backend.
///
/// The store provides atomicity per single-record write and nothing more:
/// concurrent updates to the same incident resolve last-write-wins, and
/// `stats` reads are not snapshot-consistent with concurrent writers.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait IncidentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a full incident record, stamping `created_at`/`updated_at` to
  /// the current time. Returns the stored record.
  fn create(
    &self,
    incident: NewIncident,
  ) -> impl Future<Output = Result<Incident, Self::Error>> + Send + '_;

  /// Retrieve an incident by id. Returns `None` if not found — absence is a
  /// signal, not an error.
  fn get<'a>(
    &'a self,
    incident_id: &'a str,
  ) -> impl Future<Output = Result<Option<Incident>, Self::Error>> + Send + 'a;

  /// Apply a sparse field-level merge, always refreshing `updated_at`.
  ///
  /// This is a blind conditional write: it returns `None` when the id is
  /// absent, and callers that need a 404 check existence with [`Self::get`]
  /// first.
  fn update<'a>(
    &'a self,
    incident_id: &'a str,
    patch: IncidentPatch,
  ) -> impl Future<Output = Result<Option<Incident>, Self::Error>> + Send + 'a;

  /// List incidents. Unfiltered calls return a backend-ordered page of up to
  /// the effective limit; filtered calls return records ordered by
  /// `timestamp` descending.
  fn list<'a>(
    &'a self,
    query: &'a IncidentQuery,
  ) -> impl Future<Output = Result<Vec<Incident>, Self::Error>> + Send + 'a;

  /// Full-table scan projecting only status/severity, folded into aggregate
  /// counts. O(table size); acceptable only because incident volume is low.
  fn stats(
    &self,
  ) -> impl Future<Output = Result<IncidentStats, Self::Error>> + Send + '_;
}
