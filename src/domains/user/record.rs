use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow};

use super::{
  model::{Schema, User, UserBase, UserInDb},
  validation::{FieldViolation, ValidationError},
};

/// Read access to an existing user record, for adapting it into the read model
/// without copying fields by hand.
pub trait UserAttributes {
  fn id(&self) -> i32;
  fn email(&self) -> &str;
  fn full_name(&self) -> Option<&str>;
  fn is_active(&self) -> bool;
  fn is_superuser(&self) -> bool;
  fn roles(&self) -> &[String];
  fn created_at(&self) -> Option<DateTime<Utc>>;
  fn updated_at(&self) -> Option<DateTime<Utc>>;
}

/// A row of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
  pub id: i32,
  pub email: String,
  pub full_name: Option<String>,
  pub hashed_password: String,
  pub is_active: bool,
  pub is_superuser: bool,
  pub roles: Json<Vec<String>>,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl UserAttributes for UserRecord {
  fn id(&self) -> i32 {
    self.id
  }

  fn email(&self) -> &str {
    &self.email
  }

  fn full_name(&self) -> Option<&str> {
    self.full_name.as_deref()
  }

  fn is_active(&self) -> bool {
    self.is_active
  }

  fn is_superuser(&self) -> bool {
    self.is_superuser
  }

  fn roles(&self) -> &[String] {
    &self.roles
  }

  fn created_at(&self) -> Option<DateTime<Utc>> {
    self.created_at
  }

  fn updated_at(&self) -> Option<DateTime<Utc>> {
    self.updated_at
  }
}

impl User {
  /// Builds the read model from any record exposing user attributes. The email is
  /// re-checked and a record without `created_at` is rejected.
  pub fn from_attributes<A: UserAttributes + ?Sized>(record: &A) -> Result<Self, ValidationError> {
    let base = UserBase::from_parts(
      record.email().to_string(),
      record.is_active(),
      record.is_superuser(),
      record.full_name().map(str::to_string),
      record.roles().to_vec(),
    );

    let mut violations = match validator::Validate::validate(&base) {
      Ok(()) => Vec::new(),
      Err(errors) => super::validation::violations_from(&errors),
    };

    let Some(created_at) = record.created_at() else {
      violations.push(FieldViolation::missing("created_at"));
      return Err(ValidationError::new(Self::NAME, violations));
    };
    if !violations.is_empty() {
      return Err(ValidationError::new(Self::NAME, violations));
    }

    let user = User::new(base, record.id(), created_at);
    Ok(match record.updated_at() {
      Some(updated_at) => user.with_updated_at(updated_at),
      None => user,
    })
  }
}

impl TryFrom<&UserRecord> for User {
  type Error = ValidationError;

  fn try_from(record: &UserRecord) -> Result<Self, Self::Error> {
    User::from_attributes(record)
  }
}

impl TryFrom<UserRecord> for UserInDb {
  type Error = ValidationError;

  fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
    let user = User::from_attributes(&record)?;
    Ok(UserInDb::new(user, record.hashed_password))
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::{domains::user::validation::ViolationKind, test_support::sample_record};

  #[test]
  fn adapts_record_attributes() {
    let record = sample_record(1, "a@b.com");

    let user = User::try_from(&record).unwrap();
    assert_eq!(user.id(), 1);
    assert_eq!(user.email(), "a@b.com");
    assert!(user.base().is_active());
    assert!(!user.base().is_superuser());
    assert_eq!(user.base().full_name(), None);
    assert_eq!(user.created_at(), record.created_at.unwrap());
    assert_eq!(user.updated_at(), None);
  }

  #[test]
  fn adapted_user_round_trips_through_map() {
    let mut record = sample_record(1, "a@b.com");
    record.updated_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());

    let user = User::from_attributes(&record).unwrap();
    assert_eq!(User::from_map(&user.to_map()).unwrap(), user);
  }

  #[test]
  fn rejects_record_with_invalid_email_and_no_created_at() {
    let mut record = sample_record(2, "not-an-email");
    record.created_at = None;

    let err = User::from_attributes(&record).unwrap_err();
    assert_eq!(err.shape(), "User");
    assert_eq!(err.violation_for("email").map(|v| v.kind), Some(ViolationKind::Format));
    assert_eq!(err.violation_for("created_at").map(|v| v.kind), Some(ViolationKind::Missing));
  }

  #[test]
  fn in_db_projection_keeps_hash() {
    let record = sample_record(3, "c@d.com");
    let hash = record.hashed_password.clone();

    let in_db = UserInDb::try_from(record).unwrap();
    assert_eq!(in_db.hashed_password(), hash);
    assert_eq!(in_db.user().id(), 3);
  }
}
