//! Error type for `opsboard-notify`.

use thiserror::Error;

/// A notification delivery failure. Always swallowed by the caller after
/// logging; never mapped to an API response.
#[derive(Debug, Error)]
pub enum DispatchError {
  #[error("webhook url unavailable: {0}")]
  WebhookUrl(String),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("webhook returned status {0}")]
  Status(reqwest::StatusCode),
}

pub type Result<T, E = DispatchError> = std::result::Result<T, E>;
