use chrono::{TimeZone, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;

use crate::domains::user::record::UserRecord;

/// Opaque stored hash for fixtures that never verify a password.
pub const SAMPLE_PASSWORD_HASH: &str = "$argon2id$fixture";

pub fn object(value: Value) -> Map<String, Value> {
  match value {
    Value::Object(map) => map,
    other => panic!("expected a JSON object, got {}", other),
  }
}

pub fn sample_record(id: i32, email: &str) -> UserRecord {
  UserRecord {
    id,
    email: email.to_string(),
    full_name: None,
    hashed_password: SAMPLE_PASSWORD_HASH.to_string(),
    is_active: true,
    is_superuser: false,
    roles: Json(Vec::new()),
    created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()),
    updated_at: None,
  }
}
