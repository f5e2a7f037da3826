//! CloudWatch-style alarm state changes and their translation into the
//! internal incident shape.

use serde::Deserialize;

use opsboard_core::incident::{IncidentDraft, Severity};

// ─── Wire shapes ─────────────────────────────────────────────────────────────

/// The `detail` payload of an "Alarm State Change" event.
#[derive(Debug, Clone, Deserialize)]
pub struct AlarmStateChange {
  #[serde(rename = "AlarmName")]
  pub alarm_name:           String,
  #[serde(rename = "AlarmDescription")]
  pub alarm_description:    Option<String>,
  #[serde(rename = "AlarmArn")]
  pub alarm_arn:            Option<String>,
  #[serde(rename = "Region")]
  pub region:               Option<String>,
  #[serde(rename = "AWSAccountId")]
  pub account_id:           Option<String>,
  #[serde(rename = "NewStateValue")]
  pub new_state_value:      String,
  #[serde(rename = "PreviousStateValue")]
  pub previous_state_value: Option<String>,
  #[serde(rename = "Trigger")]
  pub trigger:              Option<AlarmTrigger>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlarmTrigger {
  #[serde(rename = "Namespace")]
  pub namespace:           Option<String>,
  #[serde(rename = "MetricName")]
  pub metric_name:         Option<String>,
  #[serde(rename = "Dimensions")]
  pub dimensions:          Option<serde_json::Value>,
  #[serde(rename = "Threshold")]
  pub threshold:           Option<f64>,
  #[serde(rename = "ComparisonOperator")]
  pub comparison_operator: Option<String>,
}

// ─── Lookup tables ───────────────────────────────────────────────────────────

/// Fixed metric-namespace → service-tag table; unrecognised namespaces fall
/// back to "custom".
pub fn service_for_namespace(namespace: Option<&str>) -> &'static str {
  match namespace {
    Some("AWS/EC2") => "ec2",
    Some("AWS/RDS") => "rds",
    Some("AWS/Lambda") => "lambda",
    Some("AWS/ApiGateway") => "api-gateway",
    Some("AWS/S3") => "s3",
    Some("AWS/DynamoDB") => "dynamodb",
    _ => "custom",
  }
}

pub fn severity_for_state(state: &str) -> Severity {
  match state {
    "ALARM" => Severity::High,
    "INSUFFICIENT_DATA" => Severity::Medium,
    "OK" => Severity::Low,
    _ => Severity::Medium,
  }
}

// ─── Mapping ─────────────────────────────────────────────────────────────────

/// Translate an alarm into a creation draft: severity from the alarm state,
/// service from the metric namespace, provenance details into `metadata`.
///
/// The caller decides whether the alarm state warrants creating an incident
/// at all; this function only shapes the data.
pub fn map_alarm_to_draft(alarm: &AlarmStateChange) -> IncidentDraft {
  let namespace = alarm
    .trigger
    .as_ref()
    .and_then(|t| t.namespace.as_deref());

  let mut tags = vec!["aws".to_owned(), "cloudwatch".to_owned()];
  if let Some(ns) = namespace {
    tags.push(ns.to_lowercase().replace("aws/", ""));
  }
  if alarm.new_state_value == "ALARM" {
    tags.push("high-priority".to_owned());
  }

  let metadata = serde_json::json!({
    "alarmArn": alarm.alarm_arn,
    "region": alarm.region,
    "accountId": alarm.account_id,
    "metric": {
      "namespace": namespace,
      "metricName": alarm.trigger.as_ref().and_then(|t| t.metric_name.as_deref()),
      "dimensions": alarm.trigger.as_ref().and_then(|t| t.dimensions.clone()),
    },
    "threshold": alarm.trigger.as_ref().and_then(|t| t.threshold),
    "comparisonOperator": alarm
      .trigger
      .as_ref()
      .and_then(|t| t.comparison_operator.as_deref()),
  });

  IncidentDraft {
    incident_id: None,
    title: Some(alarm.alarm_name.clone()),
    description: Some(alarm.alarm_description.clone().unwrap_or_else(|| {
      format!("CloudWatch alarm: {}", alarm.alarm_name)
    })),
    severity: Some(severity_for_state(&alarm.new_state_value).to_string()),
    status: Some("New".to_owned()),
    service: Some(service_for_namespace(namespace).to_owned()),
    source: Some("cloudwatch".to_owned()),
    timestamp: None,
    assigned_to: None,
    tags: Some(tags),
    metadata: Some(metadata),
  }
}
