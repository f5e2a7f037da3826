//! Event routing for opsboard.
//!
//! Inbound lifecycle and alarm events are classified by their
//! `(source, detail-type)` pair and dispatched to the matching handler. The
//! router is state-free: everything it needs arrives with the event or comes
//! from the injected store.

#![allow(async_fn_in_trait)]

pub mod alarm;
pub mod bus;
pub mod error;
pub mod router;

pub use bus::{EventBus, LocalBus, NullBus};
pub use error::{Error, Result};
pub use router::EventRouter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source tag for events published by opsboard itself.
pub const INTERNAL_SOURCE: &str = "custom.incident-system";
/// Source tag for CloudWatch-style monitoring events.
pub const CLOUDWATCH_SOURCE: &str = "aws.cloudwatch";

/// An inbound or outbound bus event. The `detail` payload is opaque until a
/// handler deserialises it into its own shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub source:      String,
  #[serde(rename = "detail-type")]
  pub detail_type: String,
  pub detail:      serde_json::Value,
  #[serde(default = "Utc::now")]
  pub time:        DateTime<Utc>,
}

impl Event {
  pub fn new(
    source: impl Into<String>,
    detail_type: impl Into<String>,
    detail: serde_json::Value,
  ) -> Self {
    Self {
      source: source.into(),
      detail_type: detail_type.into(),
      detail,
      time: Utc::now(),
    }
  }

  /// The event-type label carried into the notification title.
  pub fn notification_type(&self) -> &str {
    match self.source.as_str() {
      CLOUDWATCH_SOURCE => "CloudWatch Alarm",
      INTERNAL_SOURCE => &self.detail_type,
      _ => "Incident Notification",
    }
  }
}
