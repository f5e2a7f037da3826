//! Error types for `opsboard-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("incident not found: {0}")]
  IncidentNotFound(String),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("no valid fields to update")]
  NoUpdatableFields,

  #[error("unknown severity: {0:?}")]
  UnknownSeverity(String),

  #[error("unknown status: {0:?}")]
  UnknownStatus(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
