//! The `(source, detail-type)` dispatcher.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use opsboard_core::{
  incident::{Incident, IncidentDraft, IncidentPatch, UpdateRequest},
  lifecycle::{apply_create_defaults, build_incident, generate_id},
  store::IncidentStore,
};

use crate::{
  CLOUDWATCH_SOURCE, Error, Event, INTERNAL_SOURCE, Result,
  alarm::{AlarmStateChange, map_alarm_to_draft},
};

// ─── Router ──────────────────────────────────────────────────────────────────

/// Classifies inbound events and drives them through the store.
///
/// State-free beyond the injected store: each event is handled on its own,
/// with no coordination between calls.
pub struct EventRouter<S> {
  store: Arc<S>,
}

impl<S> EventRouter<S>
where
  S: IncidentStore,
{
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  /// Route one event. Returns the incident it produced or touched, if any.
  ///
  /// An unrecognised `(source, detail-type)` pair is logged and ignored —
  /// never an error.
  pub async fn handle(&self, event: &Event) -> Result<Option<Incident>> {
    match (event.source.as_str(), event.detail_type.as_str()) {
      (CLOUDWATCH_SOURCE, "CloudWatch Alarm State Change") => {
        self.handle_alarm(event).await
      }
      (INTERNAL_SOURCE, "Incident Created") => {
        self.handle_incident_created(event).await
      }
      (INTERNAL_SOURCE, "Incident Updated" | "Incident Resolved") => {
        self.handle_incident_updated(event).await
      }
      (INTERNAL_SOURCE, "Service Health Check") => {
        self.handle_health_check(event).await
      }
      (source, detail_type) => {
        tracing::warn!(source, detail_type, "unhandled event type");
        Ok(None)
      }
    }
  }

  // ── Alarm ingestion ───────────────────────────────────────────────────────

  async fn handle_alarm(&self, event: &Event) -> Result<Option<Incident>> {
    let alarm: AlarmStateChange =
      serde_json::from_value(event.detail.clone())?;

    tracing::info!(
      alarm_name = %alarm.alarm_name,
      new_state = %alarm.new_state_value,
      "processing alarm state change"
    );

    match alarm.new_state_value.as_str() {
      "ALARM" => {
        let mut draft = map_alarm_to_draft(&alarm);
        apply_create_defaults(&mut draft);
        let incident = self.create(draft).await?;
        tracing::info!(
          incident_id = %incident.incident_id,
          alarm_name = %alarm.alarm_name,
          "created incident from alarm"
        );
        Ok(Some(incident))
      }
      "OK" => {
        // Known gap: the originating incident is not looked up and resolved
        // when an alarm recovers. Kept as a documented non-goal.
        tracing::info!(
          alarm_name = %alarm.alarm_name,
          "alarm recovered; related incidents are not auto-resolved"
        );
        Ok(None)
      }
      _ => Ok(None),
    }
  }

  // ── Internal lifecycle events ─────────────────────────────────────────────

  async fn handle_incident_created(
    &self,
    event: &Event,
  ) -> Result<Option<Incident>> {
    let mut draft: IncidentDraft = serde_json::from_value(event.detail.clone())?;
    apply_create_defaults(&mut draft);

    let incident = self.create(draft).await?;
    tracing::info!(incident_id = %incident.incident_id, "ingested incident");
    Ok(Some(incident))
  }

  async fn handle_incident_updated(
    &self,
    event: &Event,
  ) -> Result<Option<Incident>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct UpdatedDetail {
      incident_id: String,
      #[serde(flatten)]
      update:      UpdateRequest,
    }

    let detail: UpdatedDetail = serde_json::from_value(event.detail.clone())?;

    // The upstream publisher already applied the update policy; the embedded
    // fields go to the store as-is.
    let updated = self
      .store
      .update(&detail.incident_id, IncidentPatch::from(detail.update))
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;

    if updated.is_none() {
      tracing::warn!(
        incident_id = %detail.incident_id,
        "update event for unknown incident"
      );
    }
    Ok(updated)
  }

  async fn handle_health_check(
    &self,
    event: &Event,
  ) -> Result<Option<Incident>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct HealthCheckDetail {
      status:        String,
      service_name:  String,
      #[serde(default)]
      message:       Option<String>,
      #[serde(default)]
      severity:      Option<String>,
      #[serde(default)]
      url:           Option<String>,
      #[serde(default)]
      response_time: Option<serde_json::Value>,
      #[serde(default)]
      status_code:   Option<i64>,
    }

    let detail: HealthCheckDetail = serde_json::from_value(event.detail.clone())?;

    // Healthy and degraded checks are a no-op; only a hard failure opens an
    // incident.
    if detail.status != "unhealthy" {
      return Ok(None);
    }

    let mut draft = IncidentDraft {
      incident_id: Some(generate_id()),
      title: Some(format!("Service Health Issue: {}", detail.service_name)),
      description: Some(format!(
        "Health check failed for {}: {}",
        detail.service_name,
        detail.message.as_deref().unwrap_or("no detail")
      )),
      severity: detail.severity,
      status: Some("New".to_owned()),
      service: Some(detail.service_name.clone()),
      source: Some("health-check".to_owned()),
      metadata: Some(serde_json::json!({
        "healthCheckUrl": detail.url,
        "responseTime": detail.response_time,
        "statusCode": detail.status_code,
      })),
      tags: Some(vec!["health-check".to_owned(), detail.service_name]),
      ..IncidentDraft::default()
    };
    apply_create_defaults(&mut draft);

    let incident = self.create(draft).await?;
    tracing::info!(
      incident_id = %incident.incident_id,
      "created incident from failed health check"
    );
    Ok(Some(incident))
  }

  async fn create(&self, draft: IncidentDraft) -> Result<Incident> {
    let new_incident = build_incident(draft, Utc::now())?;
    self
      .store
      .create(new_incident)
      .await
      .map_err(|e| Error::Store(Box::new(e)))
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use opsboard_core::incident::{Severity, Status};
  use opsboard_store_sqlite::SqliteStore;

  use super::*;

  async fn router() -> (EventRouter<SqliteStore>, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    (EventRouter::new(store.clone()), store)
  }

  fn alarm_event(state: &str, namespace: &str) -> Event {
    Event::new(
      CLOUDWATCH_SOURCE,
      "CloudWatch Alarm State Change",
      serde_json::json!({
        "AlarmName": "HighCPU",
        "AlarmArn": "arn:aws:cloudwatch:us-east-1:123:alarm:HighCPU",
        "NewStateValue": state,
        "Trigger": { "Namespace": namespace, "MetricName": "CPUUtilization" },
      }),
    )
  }

  #[tokio::test]
  async fn alarm_state_creates_high_severity_incident() {
    let (router, store) = router().await;

    let incident = router
      .handle(&alarm_event("ALARM", "AWS/EC2"))
      .await
      .unwrap()
      .unwrap();

    assert_eq!(incident.severity, Severity::High);
    assert_eq!(incident.status, Status::New);
    assert_eq!(incident.service, "ec2");
    assert_eq!(incident.source, "cloudwatch");
    assert!(incident.tags.contains(&"high-priority".to_owned()));

    // And it was actually persisted.
    let stored = store.get(&incident.incident_id).await.unwrap();
    assert!(stored.is_some());
  }

  #[tokio::test]
  async fn ok_alarm_is_a_no_op() {
    let (router, store) = router().await;

    let result = router.handle(&alarm_event("OK", "AWS/EC2")).await.unwrap();
    assert!(result.is_none());
    assert_eq!(store.stats().await.unwrap().total, 0);
  }

  #[tokio::test]
  async fn incident_created_event_persists_embedded_detail() {
    let (router, store) = router().await;

    let event = Event::new(
      INTERNAL_SOURCE,
      "Incident Created",
      serde_json::json!({
        "incidentId": "INC-20240501-XYZ789",
        "title": "Checkout broken",
        "severity": "Critical",
        "status": "New",
        "service": "checkout",
      }),
    );

    let incident = router.handle(&event).await.unwrap().unwrap();
    assert_eq!(incident.incident_id, "INC-20240501-XYZ789");
    assert_eq!(incident.severity, Severity::Critical);
    // Absent optional fields get creation defaults.
    assert_eq!(incident.source, "manual");
    assert_eq!(incident.description, "");

    assert!(store.get("INC-20240501-XYZ789").await.unwrap().is_some());
  }

  #[tokio::test]
  async fn incident_updated_event_applies_partial_update() {
    let (router, _) = router().await;

    let created = router
      .handle(&Event::new(
        INTERNAL_SOURCE,
        "Incident Created",
        serde_json::json!({ "title": "flaky dns", "severity": "Low" }),
      ))
      .await
      .unwrap()
      .unwrap();

    let updated = router
      .handle(&Event::new(
        INTERNAL_SOURCE,
        "Incident Updated",
        serde_json::json!({
          "incidentId": created.incident_id,
          "status": "Acknowledged",
          "assignedTo": "sre@example.com",
        }),
      ))
      .await
      .unwrap()
      .unwrap();

    assert_eq!(updated.status, Status::Acknowledged);
    assert_eq!(updated.assigned_to.as_deref(), Some("sre@example.com"));
    assert_eq!(updated.title, "flaky dns");
  }

  #[tokio::test]
  async fn update_event_for_unknown_incident_is_swallowed() {
    let (router, _) = router().await;

    let result = router
      .handle(&Event::new(
        INTERNAL_SOURCE,
        "Incident Updated",
        serde_json::json!({ "incidentId": "INC-0-MISSING", "status": "Resolved" }),
      ))
      .await
      .unwrap();
    assert!(result.is_none());
  }

  #[tokio::test]
  async fn unhealthy_health_check_creates_incident() {
    let (router, _) = router().await;

    let incident = router
      .handle(&Event::new(
        INTERNAL_SOURCE,
        "Service Health Check",
        serde_json::json!({
          "status": "unhealthy",
          "serviceName": "payments",
          "message": "connection refused",
          "statusCode": 503,
        }),
      ))
      .await
      .unwrap()
      .unwrap();

    assert_eq!(incident.title, "Service Health Issue: payments");
    assert_eq!(incident.service, "payments");
    assert_eq!(incident.source, "health-check");
    assert_eq!(incident.severity, Severity::Medium);
    assert_eq!(incident.tags, ["health-check", "payments"]);
    assert_eq!(incident.metadata.unwrap()["statusCode"], 503);
  }

  #[tokio::test]
  async fn healthy_health_check_is_a_no_op() {
    let (router, store) = router().await;

    let result = router
      .handle(&Event::new(
        INTERNAL_SOURCE,
        "Service Health Check",
        serde_json::json!({ "status": "healthy", "serviceName": "payments" }),
      ))
      .await
      .unwrap();
    assert!(result.is_none());
    assert_eq!(store.stats().await.unwrap().total, 0);
  }

  #[tokio::test]
  async fn unknown_event_pair_is_ignored_not_an_error() {
    let (router, _) = router().await;

    let result = router
      .handle(&Event::new("aws.s3", "Object Created", serde_json::json!({})))
      .await
      .unwrap();
    assert!(result.is_none());
  }

  #[tokio::test]
  async fn malformed_alarm_detail_is_an_error() {
    let (router, _) = router().await;

    let event = Event::new(
      CLOUDWATCH_SOURCE,
      "CloudWatch Alarm State Change",
      serde_json::json!({ "nope": true }),
    );
    assert!(matches!(
      router.handle(&event).await.unwrap_err(),
      Error::Detail(_)
    ));
  }
}
