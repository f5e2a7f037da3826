//! Webhook URL resolution and message delivery.

use std::time::Duration;

use chrono::{DateTime, Utc};
use opsboard_core::incident::Incident;
use reqwest::Client;

use crate::{
  DispatchError, Result,
  message::{SlackMessage, build_message},
};

/// Outbound POSTs are bounded so a slow webhook cannot stall the caller.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

// ─── URL resolution ──────────────────────────────────────────────────────────

/// Resolves the webhook URL at dispatch time.
///
/// The URL lives in an external secret that can rotate, so it is looked up
/// per dispatch rather than captured at startup. A failed lookup is a
/// [`DispatchError`], never a lifecycle failure.
pub trait WebhookUrlSource: Send + Sync {
  fn resolve(&self) -> Result<String>;
}

/// Reads the webhook URL from a named environment variable.
#[derive(Debug, Clone)]
pub struct EnvWebhookSource {
  var: String,
}

impl EnvWebhookSource {
  pub fn new(var: impl Into<String>) -> Self {
    Self { var: var.into() }
  }
}

impl WebhookUrlSource for EnvWebhookSource {
  fn resolve(&self) -> Result<String> {
    std::env::var(&self.var).map_err(|_| {
      DispatchError::WebhookUrl(format!("{} is not set", self.var))
    })
  }
}

// ─── Notifier ────────────────────────────────────────────────────────────────

/// Formats and delivers incident notifications.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct Notifier {
  client:        Client,
  url_source:    std::sync::Arc<dyn WebhookUrlSource>,
  dashboard_url: String,
}

impl Notifier {
  pub fn new(
    url_source: impl WebhookUrlSource + 'static,
    dashboard_url: impl Into<String>,
  ) -> Result<Self> {
    let client = Client::builder().timeout(DISPATCH_TIMEOUT).build()?;
    Ok(Self {
      client,
      url_source: std::sync::Arc::new(url_source),
      dashboard_url: dashboard_url.into(),
    })
  }

  /// Format and deliver a notification for `incident`. The attachment is
  /// stamped with `timestamp` — the time of the triggering event, not the
  /// time of dispatch.
  ///
  /// One synchronous POST, no retry. Any non-2xx response is a delivery
  /// failure.
  pub async fn notify(
    &self,
    event_type: &str,
    incident: &Incident,
    timestamp: DateTime<Utc>,
  ) -> Result<()> {
    let message =
      build_message(event_type, incident, timestamp, &self.dashboard_url);
    self.dispatch(&message).await
  }

  pub async fn dispatch(&self, message: &SlackMessage) -> Result<()> {
    let url = self.url_source.resolve()?;
    let response = self.client.post(&url).json(message).send().await?;

    if !response.status().is_success() {
      return Err(DispatchError::Status(response.status()));
    }

    tracing::debug!("notification delivered");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use axum::{Router, http::StatusCode, routing::post};
  use tokio::net::TcpListener;

  use super::*;
  use crate::message::{Attachment, Field};

  struct FixedUrl(String);

  impl WebhookUrlSource for FixedUrl {
    fn resolve(&self) -> Result<String> {
      Ok(self.0.clone())
    }
  }

  fn message() -> SlackMessage {
    SlackMessage {
      username:    "Opsboard",
      icon_emoji:  ":warning:",
      attachments: vec![Attachment {
        color:      "#FF6600",
        title:      "🚨 Incident Created".to_owned(),
        title_link: "https://x/incidents/INC-1".to_owned(),
        fields:     vec![Field {
          title: "Incident ID",
          value: "INC-1".to_owned(),
          short: true,
        }],
        footer:     "Opsboard Incident Dashboard",
        ts:         0,
      }],
    }
  }

  /// Serve `status` for every POST on an ephemeral port, counting hits.
  async fn webhook_stub(status: StatusCode) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
      "/hook",
      post(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { status }
      }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/hook"), hits)
  }

  /// Like [`webhook_stub`], but records every POSTed JSON body.
  async fn capturing_stub() -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let captured = bodies.clone();
    let app = Router::new().route(
      "/hook",
      post(move |body: axum::body::Bytes| {
        let captured = captured.clone();
        async move {
          let value: serde_json::Value =
            serde_json::from_slice(&body).unwrap();
          captured.lock().unwrap().push(value);
          StatusCode::OK
        }
      }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/hook"), bodies)
  }

  #[tokio::test]
  async fn dispatch_posts_to_webhook() {
    let (url, hits) = webhook_stub(StatusCode::OK).await;
    let notifier = Notifier::new(FixedUrl(url), "https://x").unwrap();

    notifier.dispatch(&message()).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn non_2xx_response_is_a_dispatch_error() {
    let (url, _) = webhook_stub(StatusCode::INTERNAL_SERVER_ERROR).await;
    let notifier = Notifier::new(FixedUrl(url), "https://x").unwrap();

    let err = notifier.dispatch(&message()).await.unwrap_err();
    assert!(matches!(
      err,
      DispatchError::Status(StatusCode::INTERNAL_SERVER_ERROR)
    ));
  }

  #[tokio::test]
  async fn notify_stamps_attachment_with_event_time() {
    let (url, bodies) = capturing_stub().await;
    let notifier = Notifier::new(FixedUrl(url), "https://x").unwrap();

    let now = Utc::now();
    let event_time = now - chrono::Duration::hours(2);
    let incident = Incident {
      incident_id: "INC-20240501-AB12CD".to_owned(),
      title:       "API latency".to_owned(),
      description: String::new(),
      severity:    opsboard_core::incident::Severity::High,
      status:      opsboard_core::incident::Status::New,
      service:     "api-gateway".to_owned(),
      source:      "manual".to_owned(),
      timestamp:   now,
      assigned_to: None,
      tags:        Vec::new(),
      metadata:    None,
      created_at:  now,
      updated_at:  now,
      resolved_at: None,
    };

    notifier
      .notify("Incident Created", &incident, event_time)
      .await
      .unwrap();

    let bodies = bodies.lock().unwrap();
    assert_eq!(
      bodies[0]["attachments"][0]["ts"].as_i64(),
      Some(event_time.timestamp())
    );
  }

  #[tokio::test]
  async fn missing_webhook_url_is_a_dispatch_error() {
    let notifier = Notifier::new(
      EnvWebhookSource::new("OPSBOARD_TEST_WEBHOOK_UNSET"),
      "https://x",
    )
    .unwrap();

    let err = notifier.dispatch(&message()).await.unwrap_err();
    assert!(matches!(err, DispatchError::WebhookUrl(_)));
  }
}
