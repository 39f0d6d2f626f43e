use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Field name used for violations that concern the whole input rather than one key.
pub const ROOT_FIELD: &str = "__root__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
  /// A required field was not supplied.
  Missing,
  /// The value has the wrong JSON type, or is `null` where a value is required.
  Type,
  /// The value has the right type but fails a format rule.
  Format,
}

impl ViolationKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ViolationKind::Missing => "missing",
      ViolationKind::Type => "type",
      ViolationKind::Format => "format",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
  pub field: String,
  pub kind: ViolationKind,
  pub message: String,
}

impl FieldViolation {
  pub fn new(field: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
    Self {
      field: field.into(),
      kind,
      message: message.into(),
    }
  }

  pub fn missing(field: impl Into<String>) -> Self {
    Self::new(field, ViolationKind::Missing, "field required")
  }

  pub fn wrong_type(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::new(field, ViolationKind::Type, message)
  }

  pub fn format(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::new(field, ViolationKind::Format, message)
  }
}

impl fmt::Display for FieldViolation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({}): {}", self.field, self.kind.as_str(), self.message)
  }
}

/// The single error raised when constructing a user shape from untrusted input.
///
/// Carries the name of the shape being built and every violation found, in the
/// order the fields were checked. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {shape}: {}", join_violations(.violations))]
pub struct ValidationError {
  shape: &'static str,
  violations: Vec<FieldViolation>,
}

impl ValidationError {
  pub fn new(shape: &'static str, violations: Vec<FieldViolation>) -> Self {
    Self { shape, violations }
  }

  pub fn single(shape: &'static str, violation: FieldViolation) -> Self {
    Self::new(shape, vec![violation])
  }

  pub fn shape(&self) -> &'static str {
    self.shape
  }

  pub fn violations(&self) -> &[FieldViolation] {
    &self.violations
  }

  pub fn into_violations(self) -> Vec<FieldViolation> {
    self.violations
  }

  /// Names of the offending fields, deduplicated, in check order.
  pub fn fields(&self) -> Vec<&str> {
    let mut fields: Vec<&str> = Vec::with_capacity(self.violations.len());
    for violation in &self.violations {
      if !fields.contains(&violation.field.as_str()) {
        fields.push(&violation.field);
      }
    }
    fields
  }

  pub fn has_field(&self, field: &str) -> bool {
    self.violations.iter().any(|v| v.field == field)
  }

  pub fn violation_for(&self, field: &str) -> Option<&FieldViolation> {
    self.violations.iter().find(|v| v.field == field)
  }
}

fn join_violations(violations: &[FieldViolation]) -> String {
  violations
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("; ")
}

/// Flattens the errors reported by a `validator::Validate` impl into format violations.
///
/// Nested struct errors are reported under the leaf field name, since nested shapes are
/// flattened when serialized.
pub(crate) fn violations_from(errors: &validator::ValidationErrors) -> Vec<FieldViolation> {
  let mut out = Vec::new();
  collect_violations(errors, &mut out);
  out.sort_by(|a, b| a.field.cmp(&b.field));
  out
}

fn collect_violations(errors: &validator::ValidationErrors, out: &mut Vec<FieldViolation>) {
  use validator::ValidationErrorsKind;

  for (field, kind) in errors.errors() {
    match kind {
      ValidationErrorsKind::Field(field_errors) => {
        for error in field_errors {
          let message = error
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("failed `{}` check", error.code));
          out.push(FieldViolation::format(field.to_string(), message));
        }
      }
      ValidationErrorsKind::Struct(nested) => collect_violations(nested, out),
      ValidationErrorsKind::List(items) => {
        for nested in items.values() {
          collect_violations(nested, out);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_lists_every_violation() {
    let err = ValidationError::new(
      "UserCreate",
      vec![
        FieldViolation::format("email", "value is not a valid email address"),
        FieldViolation::missing("password"),
      ],
    );

    let text = err.to_string();
    assert!(text.starts_with("invalid UserCreate: "));
    assert!(text.contains("email (format): value is not a valid email address"));
    assert!(text.contains("password (missing): field required"));
  }

  #[test]
  fn fields_are_deduplicated_in_order() {
    let err = ValidationError::new(
      "User",
      vec![
        FieldViolation::missing("id"),
        FieldViolation::format("email", "bad"),
        FieldViolation::format("email", "worse"),
      ],
    );

    assert_eq!(err.fields(), vec!["id", "email"]);
    assert!(err.has_field("email"));
    assert!(!err.has_field("created_at"));
    assert_eq!(err.violation_for("id").map(|v| v.kind), Some(ViolationKind::Missing));
  }

  #[test]
  fn violation_serializes_with_snake_case_kind() {
    let value = serde_json::to_value(FieldViolation::wrong_type("is_active", "expected a boolean")).unwrap();
    assert_eq!(value["field"], "is_active");
    assert_eq!(value["kind"], "type");
  }
}
