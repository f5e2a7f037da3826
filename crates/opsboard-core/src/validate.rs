//! Pre-persistence validation of incident creation input.
//!
//! Pure functions only: every rule is checked independently (no
//! short-circuit) and the full list of violations is returned. Callers join
//! the messages into a single `ValidationError` when the list is non-empty.

use std::str::FromStr;

use crate::incident::{IncidentDraft, Severity, Status};

pub const MAX_TITLE_LEN: usize = 200;

/// Validate a creation draft. Returns the empty vec when valid.
///
/// The update path deliberately does not call this — see
/// [`crate::incident::UpdateRequest`].
pub fn validate(draft: &IncidentDraft) -> Vec<String> {
  let mut violations = Vec::new();

  match &draft.title {
    Some(t) if !t.trim().is_empty() => {
      if t.chars().count() > MAX_TITLE_LEN {
        violations
          .push(format!("title must be at most {MAX_TITLE_LEN} characters"));
      }
    }
    _ => violations.push("title is required".to_owned()),
  }

  if draft
    .severity
    .as_deref()
    .is_none_or(|s| Severity::from_str(s).is_err())
  {
    violations.push("valid severity is required (Critical, High, Medium, Low)".to_owned());
  }

  if draft
    .status
    .as_deref()
    .is_none_or(|s| Status::from_str(s).is_err())
  {
    violations.push(
      "valid status is required (New, Acknowledged, InProgress, Resolved)"
        .to_owned(),
    );
  }

  violations
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lifecycle::apply_create_defaults;

  fn draft(title: &str) -> IncidentDraft {
    let mut d = IncidentDraft {
      title: Some(title.to_owned()),
      ..IncidentDraft::default()
    };
    apply_create_defaults(&mut d);
    d
  }

  #[test]
  fn well_formed_draft_is_valid() {
    assert!(validate(&draft("Database is down")).is_empty());
  }

  #[test]
  fn missing_title_is_rejected() {
    let mut d = draft("x");
    d.title = None;
    let violations = validate(&d);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].contains("title"));
  }

  #[test]
  fn blank_title_is_rejected() {
    assert_eq!(validate(&draft("   ")).len(), 1);
  }

  #[test]
  fn overlong_title_is_rejected() {
    let violations = validate(&draft(&"x".repeat(201)));
    assert_eq!(violations.len(), 1);
    assert!(violations[0].contains("200"));
  }

  #[test]
  fn title_at_limit_is_accepted() {
    assert!(validate(&draft(&"x".repeat(200))).is_empty());
  }

  #[test]
  fn bad_severity_is_rejected() {
    let mut d = draft("x");
    d.severity = Some("Catastrophic".to_owned());
    let violations = validate(&d);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].contains("severity"));
  }

  #[test]
  fn bad_status_is_rejected() {
    let mut d = draft("x");
    d.status = Some("Open".to_owned());
    assert_eq!(validate(&d).len(), 1);
  }

  #[test]
  fn violations_accumulate_without_short_circuit() {
    let d = IncidentDraft::default();
    // No title, no severity, no status: all three rules fire.
    assert_eq!(validate(&d).len(), 3);
  }
}
