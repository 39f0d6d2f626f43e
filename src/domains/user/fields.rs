use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use validator::Validate;

use super::validation::{violations_from, FieldViolation, ValidationError};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Reads typed fields out of a raw key/value mapping, collecting every violation
/// instead of stopping at the first one.
///
/// Keys not asked for are ignored. `null` counts as "absent" for fields that have a
/// default and as a type error for required fields.
pub struct FieldReader<'a> {
  map: &'a Map<String, Value>,
  violations: Vec<FieldViolation>,
  fields_set: Vec<&'static str>,
}

impl<'a> FieldReader<'a> {
  pub fn new(map: &'a Map<String, Value>) -> Self {
    Self {
      map,
      violations: Vec::new(),
      fields_set: Vec::new(),
    }
  }

  /// Fields that were explicitly supplied, in read order.
  pub fn fields_set(&self) -> &[&'static str] {
    &self.fields_set
  }

  pub fn push(&mut self, violation: FieldViolation) {
    self.violations.push(violation);
  }

  /// Runs the `Validate` rules of an already materialized piece and records its failures.
  pub fn check<T: Validate>(&mut self, value: &T) {
    if let Err(errors) = value.validate() {
      self.violations.extend(violations_from(&errors));
    }
  }

  pub fn is_clean(&self) -> bool {
    self.violations.is_empty()
  }

  /// Returns the value when it was built and nothing was violated along the way.
  pub fn finish<T>(self, shape: &'static str, value: Option<T>) -> Result<T, ValidationError> {
    match value {
      Some(value) if self.violations.is_empty() => Ok(value),
      _ => Err(ValidationError::new(shape, self.violations)),
    }
  }

  pub fn required_string(&mut self, field: &'static str) -> Option<String> {
    match self.required(field)? {
      Value::String(s) => Some(s.clone()),
      other => self.type_error(field, "a string", other),
    }
  }

  pub fn optional_string(&mut self, field: &'static str) -> Option<String> {
    match self.optional(field)? {
      Value::String(s) => Some(s.clone()),
      other => self.type_error(field, "a string", other),
    }
  }

  pub fn bool_or(&mut self, field: &'static str, default: bool) -> bool {
    match self.defaulted(field) {
      None => default,
      Some(Value::Bool(b)) => *b,
      Some(other) => self.type_error(field, "a boolean", other).unwrap_or(default),
    }
  }

  pub fn string_list(&mut self, field: &'static str) -> Vec<String> {
    let items = match self.defaulted(field) {
      None => return Vec::new(),
      Some(Value::Array(items)) => items,
      Some(other) => return self.type_error(field, "a list of strings", other).unwrap_or_default(),
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
      match item {
        Value::String(s) => out.push(s.clone()),
        other => self.push(FieldViolation::wrong_type(
          format!("{}.{}", field, index),
          format!("expected a string, got {}", json_type(other)),
        )),
      }
    }
    out
  }

  pub fn required_i32(&mut self, field: &'static str) -> Option<i32> {
    let value = self.required(field)?;
    let Value::Number(number) = value else {
      return self.type_error(field, "an integer", value);
    };

    match number.as_i64() {
      Some(n) => match i32::try_from(n) {
        Ok(n) => Some(n),
        Err(_) => {
          self.push(FieldViolation::format(field, format!("{} is out of range for a 32-bit integer", n)));
          None
        }
      },
      None if number.is_f64() => self.type_error(field, "an integer", value),
      None => {
        self.push(FieldViolation::format(field, format!("{} is out of range for a 32-bit integer", number)));
        None
      }
    }
  }

  pub fn required_timestamp(&mut self, field: &'static str) -> Option<DateTime<Utc>> {
    let value = self.required(field)?;
    self.timestamp(field, value)
  }

  pub fn optional_timestamp(&mut self, field: &'static str) -> Option<DateTime<Utc>> {
    let value = self.optional(field)?;
    self.timestamp(field, value)
  }

  fn timestamp(&mut self, field: &'static str, value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
      Value::String(s) => parse_timestamp(s),
      Value::Number(n) => n.as_i64().and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
      other => return self.type_error(field, "a timestamp", other),
    };

    if parsed.is_none() {
      self.push(FieldViolation::format(field, format!("{} is not a valid timestamp", value)));
    }
    parsed
  }

  /// Looks up a field that must be present and non-null.
  fn required(&mut self, field: &'static str) -> Option<&'a Value> {
    let map = self.map;
    match map.get(field) {
      None => {
        self.push(FieldViolation::missing(field));
        None
      }
      Some(Value::Null) => {
        self.fields_set.push(field);
        self.push(FieldViolation::wrong_type(field, "expected a value, got null"));
        None
      }
      Some(value) => {
        self.fields_set.push(field);
        Some(value)
      }
    }
  }

  /// Looks up a nullable field; an explicit `null` still counts as set.
  fn optional(&mut self, field: &'static str) -> Option<&'a Value> {
    let map = self.map;
    let value = map.get(field)?;
    self.fields_set.push(field);
    match value {
      Value::Null => None,
      value => Some(value),
    }
  }

  /// Looks up a field with a default; `null` is treated as absent.
  fn defaulted(&mut self, field: &'static str) -> Option<&'a Value> {
    let map = self.map;
    match map.get(field) {
      None | Some(Value::Null) => None,
      Some(value) => {
        self.fields_set.push(field);
        Some(value)
      }
    }
  }

  fn type_error<T>(&mut self, field: &'static str, expected: &str, got: &Value) -> Option<T> {
    self.push(FieldViolation::wrong_type(
      field,
      format!("expected {}, got {}", expected, json_type(got)),
    ));
    None
  }
}

/// Accepts RFC 3339, or ISO-8601 without an offset (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
    return Some(ts.with_timezone(&Utc));
  }
  NAIVE_FORMATS
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    .map(|naive| naive.and_utc())
}

pub(crate) fn json_type(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(n) if n.is_f64() => "a float",
    Value::Number(_) => "an integer",
    Value::String(_) => "a string",
    Value::Array(_) => "a list",
    Value::Object(_) => "an object",
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;
  use crate::domains::user::validation::ViolationKind;

  fn map(value: Value) -> Map<String, Value> {
    match value {
      Value::Object(map) => map,
      _ => panic!("test input must be an object"),
    }
  }

  #[test]
  fn required_string_reports_missing_and_null() {
    let input = map(json!({ "password": null }));
    let mut reader = FieldReader::new(&input);

    assert_eq!(reader.required_string("email"), None);
    assert_eq!(reader.required_string("password"), None);

    let err = reader.finish::<()>("Test", None).unwrap_err();
    assert_eq!(err.violation_for("email").map(|v| v.kind), Some(ViolationKind::Missing));
    assert_eq!(err.violation_for("password").map(|v| v.kind), Some(ViolationKind::Type));
  }

  #[test]
  fn defaulted_bool_treats_null_as_absent() {
    let input = map(json!({ "is_active": null, "is_superuser": true }));
    let mut reader = FieldReader::new(&input);

    assert!(reader.bool_or("is_active", true));
    assert!(reader.bool_or("is_superuser", false));
    assert!(reader.is_clean());
    assert_eq!(reader.fields_set(), &["is_superuser"]);
  }

  #[test]
  fn bool_does_not_coerce_strings() {
    let input = map(json!({ "is_active": "true" }));
    let mut reader = FieldReader::new(&input);

    assert!(reader.bool_or("is_active", true));
    let err = reader.finish::<()>("Test", Some(())).unwrap_err();
    assert_eq!(err.violations()[0].message, "expected a boolean, got a string");
  }

  #[test]
  fn optional_null_counts_as_set() {
    let input = map(json!({ "full_name": null }));
    let mut reader = FieldReader::new(&input);

    assert_eq!(reader.optional_string("full_name"), None);
    assert!(reader.is_clean());
    assert_eq!(reader.fields_set(), &["full_name"]);
  }

  #[test]
  fn integers_are_range_checked() {
    let input = map(json!({ "a": 7, "b": 1.5, "c": 3_000_000_000_i64 }));
    let mut reader = FieldReader::new(&input);

    assert_eq!(reader.required_i32("a"), Some(7));
    assert_eq!(reader.required_i32("b"), None);
    assert_eq!(reader.required_i32("c"), None);

    let err = reader.finish::<()>("Test", None).unwrap_err();
    assert_eq!(err.violation_for("b").map(|v| v.kind), Some(ViolationKind::Type));
    assert_eq!(err.violation_for("c").map(|v| v.kind), Some(ViolationKind::Format));
  }

  #[test]
  fn list_items_are_reported_by_index() {
    let input = map(json!({ "roles": ["admin", 3] }));
    let mut reader = FieldReader::new(&input);

    assert_eq!(reader.string_list("roles"), vec!["admin".to_string()]);
    let err = reader.finish::<()>("Test", Some(())).unwrap_err();
    assert!(err.has_field("roles.1"));
  }

  #[test]
  fn timestamps_accept_common_encodings() {
    let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

    assert_eq!(parse_timestamp("2024-05-01T12:30:00Z"), Some(expected));
    assert_eq!(parse_timestamp("2024-05-01T14:30:00+02:00"), Some(expected));
    assert_eq!(parse_timestamp("2024-05-01T12:30:00"), Some(expected));
    assert_eq!(parse_timestamp("2024-05-01 12:30:00.000"), Some(expected));
    assert_eq!(parse_timestamp("yesterday"), None);

    let input = map(json!({ "created_at": expected.timestamp(), "updated_at": "soon" }));
    let mut reader = FieldReader::new(&input);
    assert_eq!(reader.required_timestamp("created_at"), Some(expected));
    assert_eq!(reader.optional_timestamp("updated_at"), None);
    assert!(!reader.is_clean());
  }
}
