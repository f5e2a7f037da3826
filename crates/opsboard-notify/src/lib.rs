//! Outbound chat notifications for incident lifecycle events.
//!
//! Formats an incident into a Slack-style attachment payload and delivers it
//! with a single bounded POST. Delivery is strictly best-effort: every error
//! here is a [`DispatchError`], and callers log and drop it — a failed
//! notification never fails the incident operation that triggered it.

pub mod error;
pub mod message;
pub mod webhook;

pub use error::{DispatchError, Result};
pub use message::build_message;
pub use webhook::{EnvWebhookSource, Notifier, WebhookUrlSource};
