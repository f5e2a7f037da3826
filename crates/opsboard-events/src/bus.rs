//! The `EventBus` publish abstraction and the in-process implementation.

use std::{future::Future, sync::Arc};

use opsboard_core::store::IncidentStore;
use opsboard_notify::Notifier;

use crate::{Event, EventRouter, Result};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// At-least-once publish of lifecycle events. Core code only publishes —
/// subscription management is someone else's problem.
///
/// Publishing is fire-and-forget from the caller's perspective: whatever the
/// downstream pipeline does with the event never changes the response already
/// determined by the persistence step.
pub trait EventBus: Send + Sync {
  fn publish(
    &self,
    event: Event,
  ) -> impl Future<Output = Result<()>> + Send + '_;
}

// ─── In-process bus ──────────────────────────────────────────────────────────

/// Runs published events through the router and then the notifier on a
/// spawned task, decoupled from the publishing request.
///
/// Router failures and dispatch failures alike are logged and dropped;
/// nothing is retried.
pub struct LocalBus<S> {
  router:   Arc<EventRouter<S>>,
  notifier: Notifier,
}

impl<S> LocalBus<S>
where
  S: IncidentStore + 'static,
{
  pub fn new(router: Arc<EventRouter<S>>, notifier: Notifier) -> Self {
    Self { router, notifier }
  }
}

impl<S> EventBus for LocalBus<S>
where
  S: IncidentStore + 'static,
{
  async fn publish(&self, event: Event) -> Result<()> {
    let router = self.router.clone();
    let notifier = self.notifier.clone();

    tokio::spawn(async move {
      let incident = match router.handle(&event).await {
        Ok(Some(incident)) => incident,
        Ok(None) => return,
        Err(e) => {
          tracing::error!(error = %e, "event routing failed");
          return;
        }
      };

      if let Err(e) = notifier
        .notify(event.notification_type(), &incident, event.time)
        .await
      {
        tracing::error!(
          error = %e,
          incident_id = %incident.incident_id,
          "notification dispatch failed"
        );
      }
    });

    Ok(())
  }
}

// ─── Null bus ────────────────────────────────────────────────────────────────

/// Swallows every publish. Useful in tests and for running the API without a
/// notification pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBus;

impl EventBus for NullBus {
  async fn publish(&self, _event: Event) -> Result<()> {
    Ok(())
  }
}
