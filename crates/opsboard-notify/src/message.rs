//! Slack attachment payload construction.
//!
//! The payload shape is specific to Slack's incoming-webhook format and can
//! be swapped without touching lifecycle logic — nothing outside this crate
//! knows about colors, glyphs, or field layout.

use chrono::{DateTime, Utc};
use opsboard_core::incident::{Incident, Severity, Status};
use serde::Serialize;

// ─── Payload types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SlackMessage {
  pub username:    &'static str,
  pub icon_emoji:  &'static str,
  pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
  pub color:      &'static str,
  pub title:      String,
  pub title_link: String,
  pub fields:     Vec<Field>,
  pub footer:     &'static str,
  /// Unix seconds, rendered by Slack as the attachment timestamp.
  pub ts:         i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Field {
  pub title: &'static str,
  pub value: String,
  pub short: bool,
}

impl Field {
  fn short(title: &'static str, value: impl Into<String>) -> Self {
    Self { title, value: value.into(), short: true }
  }

  fn long(title: &'static str, value: impl Into<String>) -> Self {
    Self { title, value: value.into(), short: false }
  }
}

// ─── Lookup tables ───────────────────────────────────────────────────────────

fn severity_color(severity: Severity) -> &'static str {
  match severity {
    Severity::Critical => "#FF0000",
    Severity::High => "#FF6600",
    Severity::Medium => "#FFCC00",
    Severity::Low => "#00FF00",
  }
}

fn status_glyph(status: Status) -> &'static str {
  match status {
    Status::New => "🚨",
    Status::Acknowledged => "👀",
    Status::InProgress => "🔧",
    Status::Resolved => "✅",
  }
}

/// Render the span between creation and resolution as `"<h>h <m>m"`, or just
/// `"<m>m"` when under an hour.
pub fn format_resolution_time(
  start: DateTime<Utc>,
  end: DateTime<Utc>,
) -> String {
  let minutes = (end - start).num_minutes().max(0);
  let (hours, minutes) = (minutes / 60, minutes % 60);
  if hours > 0 {
    format!("{hours}h {minutes}m")
  } else {
    format!("{minutes}m")
  }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Build the outbound message for `incident` after a lifecycle event of
/// `event_type` (e.g. "Incident Created", "Incident Resolved").
pub fn build_message(
  event_type: &str,
  incident: &Incident,
  timestamp: DateTime<Utc>,
  dashboard_url: &str,
) -> SlackMessage {
  let mut fields = vec![
    Field::short("Incident ID", &incident.incident_id),
    Field::short("Severity", incident.severity.as_str()),
    Field::short("Status", incident.status.as_str()),
    Field::short("Service", &incident.service),
    Field::long("Title", &incident.title),
    Field::long(
      "Description",
      if incident.description.is_empty() {
        "No description available"
      } else {
        incident.description.as_str()
      },
    ),
  ];

  if let Some(assignee) = &incident.assigned_to {
    fields.push(Field::short("Assigned To", assignee));
  }

  // Resolution time only when the incident is actually resolved and carries
  // a stamp.
  if incident.status == Status::Resolved
    && let Some(resolved_at) = incident.resolved_at
  {
    fields.push(Field::short(
      "Resolution Time",
      format_resolution_time(incident.timestamp, resolved_at),
    ));
  }

  SlackMessage {
    username: "Opsboard",
    icon_emoji: ":warning:",
    attachments: vec![Attachment {
      color: severity_color(incident.severity),
      title: format!("{} {event_type}", status_glyph(incident.status)),
      title_link: format!(
        "{}/incidents/{}",
        dashboard_url.trim_end_matches('/'),
        incident.incident_id
      ),
      fields,
      footer: "Opsboard Incident Dashboard",
      ts: timestamp.timestamp(),
    }],
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn incident(severity: Severity, status: Status) -> Incident {
    let now = Utc::now();
    Incident {
      incident_id: "INC-20240501-AB12CD".to_owned(),
      title:       "API latency".to_owned(),
      description: String::new(),
      severity,
      status,
      service:     "api-gateway".to_owned(),
      source:      "manual".to_owned(),
      timestamp:   now,
      assigned_to: None,
      tags:        Vec::new(),
      metadata:    None,
      created_at:  now,
      updated_at:  now,
      resolved_at: None,
    }
  }

  #[test]
  fn color_tracks_severity() {
    for (severity, color) in [
      (Severity::Critical, "#FF0000"),
      (Severity::High, "#FF6600"),
      (Severity::Medium, "#FFCC00"),
      (Severity::Low, "#00FF00"),
    ] {
      let msg = build_message(
        "Incident Created",
        &incident(severity, Status::New),
        Utc::now(),
        "https://ops.example.com",
      );
      assert_eq!(msg.attachments[0].color, color);
    }
  }

  #[test]
  fn title_carries_status_glyph_and_event_type() {
    let msg = build_message(
      "Incident Created",
      &incident(Severity::High, Status::New),
      Utc::now(),
      "https://ops.example.com",
    );
    assert_eq!(msg.attachments[0].title, "🚨 Incident Created");
    assert_eq!(
      msg.attachments[0].title_link,
      "https://ops.example.com/incidents/INC-20240501-AB12CD"
    );
  }

  #[test]
  fn fixed_fields_are_present_and_empty_description_is_substituted() {
    let msg = build_message(
      "Incident Created",
      &incident(Severity::Medium, Status::New),
      Utc::now(),
      "https://ops.example.com",
    );
    let fields = &msg.attachments[0].fields;
    assert_eq!(fields.len(), 6);
    assert_eq!(fields[0].value, "INC-20240501-AB12CD");
    assert_eq!(fields[5].value, "No description available");
  }

  #[test]
  fn assignee_field_is_conditional() {
    let mut inc = incident(Severity::Low, Status::Acknowledged);
    inc.assigned_to = Some("oncall@example.com".to_owned());
    let msg =
      build_message("Incident Updated", &inc, Utc::now(), "https://x");
    assert!(
      msg.attachments[0]
        .fields
        .iter()
        .any(|f| f.title == "Assigned To" && f.value == "oncall@example.com")
    );
  }

  #[test]
  fn resolution_time_only_when_resolved_with_stamp() {
    let mut inc = incident(Severity::High, Status::Resolved);
    // Resolved status but no stamp: no duration field.
    let msg =
      build_message("Incident Resolved", &inc, Utc::now(), "https://x");
    assert!(
      !msg.attachments[0]
        .fields
        .iter()
        .any(|f| f.title == "Resolution Time")
    );

    inc.resolved_at = Some(inc.timestamp + chrono::Duration::minutes(95));
    let msg =
      build_message("Incident Resolved", &inc, Utc::now(), "https://x");
    let duration = msg.attachments[0]
      .fields
      .iter()
      .find(|f| f.title == "Resolution Time")
      .unwrap();
    assert_eq!(duration.value, "1h 35m");
  }

  #[test]
  fn sub_hour_durations_render_minutes_only() {
    let start = Utc::now();
    assert_eq!(
      format_resolution_time(start, start + chrono::Duration::minutes(42)),
      "42m"
    );
    assert_eq!(format_resolution_time(start, start), "0m");
  }
}
