use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use validator::Validate;

use super::{
  fields::{json_type, FieldReader},
  validation::{violations_from, FieldViolation, ValidationError, ROOT_FIELD},
};

/// A validated record shape that can be built from, and written back to, a flat
/// key/value mapping.
pub trait Schema: Sized {
  /// Shape name reported in validation errors.
  const NAME: &'static str;

  /// Reads this shape's fields, recording violations on the reader. Returns `None`
  /// when a required piece could not be built.
  fn read(reader: &mut FieldReader<'_>) -> Option<Self>;

  fn to_map(&self) -> Map<String, Value>;

  fn from_map(map: &Map<String, Value>) -> Result<Self, ValidationError> {
    let mut reader = FieldReader::new(map);
    let value = Self::read(&mut reader);
    reader.finish(Self::NAME, value)
  }

  fn from_value(value: Value) -> Result<Self, ValidationError> {
    match value {
      Value::Object(map) => Self::from_map(&map),
      other => Err(ValidationError::single(
        Self::NAME,
        FieldViolation::wrong_type(ROOT_FIELD, format!("expected an object, got {}", json_type(&other))),
      )),
    }
  }

  fn from_json(raw: &str) -> Result<Self, ValidationError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
      ValidationError::single(Self::NAME, FieldViolation::format(ROOT_FIELD, format!("invalid JSON: {}", e)))
    })?;
    Self::from_value(value)
  }

  fn to_value(&self) -> Value {
    Value::Object(self.to_map())
  }
}

fn timestamp_value(ts: &DateTime<Utc>) -> Value {
  Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn optional_value<T: Into<Value>>(value: Option<T>) -> Value {
  value.map(Into::into).unwrap_or(Value::Null)
}

/// Tightens the `email` rule: no empty or doubled dots in the local part, and a
/// dotted domain name rather than a bare host or an address literal. Inputs without
/// a local part and a domain are left to the `email` rule.
fn check_email_parts(email: &str) -> Result<(), validator::ValidationError> {
  let Some((local, domain)) = email.rsplit_once('@') else {
    return Ok(());
  };
  if local.is_empty() || domain.is_empty() {
    return Ok(());
  }

  let reason = if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
    "the part before the @ must not start, end or repeat dots"
  } else if domain.starts_with('[') {
    "address literals are not accepted as the domain"
  } else if !domain.contains('.') || domain.split('.').any(str::is_empty) {
    "the domain must be a dotted name such as example.com"
  } else {
    return Ok(());
  };

  let mut error = validator::ValidationError::new("email_parts");
  error.message = Some(reason.into());
  Err(error)
}

/// Fields shared by every user shape.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct UserBase {
  #[validate(
    email(message = "value is not a valid email address"),
    custom(function = "check_email_parts")
  )]
  email: String,
  is_active: bool,
  is_superuser: bool,
  full_name: Option<String>,
  roles: Vec<String>,
}

impl UserBase {
  pub fn new(email: impl Into<String>) -> Result<Self, ValidationError> {
    let base = Self::from_parts(email.into(), true, false, None, Vec::new());
    base
      .validate()
      .map_err(|e| ValidationError::new(Self::NAME, violations_from(&e)))?;
    Ok(base)
  }

  /// Builds without running the field rules; callers must `check` the result.
  pub(crate) fn from_parts(
    email: String,
    is_active: bool,
    is_superuser: bool,
    full_name: Option<String>,
    roles: Vec<String>,
  ) -> Self {
    Self {
      email,
      is_active,
      is_superuser,
      full_name,
      roles,
    }
  }

  pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
    self.full_name = Some(full_name.into());
    self
  }

  pub fn with_active(mut self, is_active: bool) -> Self {
    self.is_active = is_active;
    self
  }

  pub fn with_superuser(mut self, is_superuser: bool) -> Self {
    self.is_superuser = is_superuser;
    self
  }

  pub fn with_roles<I, S>(mut self, roles: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.roles = roles.into_iter().map(Into::into).collect();
    self
  }

  pub fn email(&self) -> &str {
    &self.email
  }

  pub fn is_active(&self) -> bool {
    self.is_active
  }

  pub fn is_superuser(&self) -> bool {
    self.is_superuser
  }

  pub fn full_name(&self) -> Option<&str> {
    self.full_name.as_deref()
  }

  pub fn roles(&self) -> &[String] {
    &self.roles
  }

  fn write_into(&self, map: &mut Map<String, Value>) {
    map.insert("email".into(), Value::from(self.email.clone()));
    map.insert("is_active".into(), Value::from(self.is_active));
    map.insert("is_superuser".into(), Value::from(self.is_superuser));
    map.insert("full_name".into(), optional_value(self.full_name.clone()));
    map.insert("roles".into(), Value::from(self.roles.clone()));
  }
}

impl Schema for UserBase {
  const NAME: &'static str = "UserBase";

  fn read(reader: &mut FieldReader<'_>) -> Option<Self> {
    let email = reader.required_string("email");
    let is_active = reader.bool_or("is_active", true);
    let is_superuser = reader.bool_or("is_superuser", false);
    let full_name = reader.optional_string("full_name");
    let roles = reader.string_list("roles");

    let base = Self::from_parts(email?, is_active, is_superuser, full_name, roles);
    reader.check(&base);
    Some(base)
  }

  fn to_map(&self) -> Map<String, Value> {
    let mut map = Map::new();
    self.write_into(&mut map);
    map
  }
}

/// Payload for creating a user. The password is plaintext at this layer.
#[derive(Clone, PartialEq, Eq)]
pub struct UserCreate {
  base: UserBase,
  password: String,
}

impl UserCreate {
  pub fn new(base: UserBase, password: impl Into<String>) -> Self {
    Self {
      base,
      password: password.into(),
    }
  }

  pub fn base(&self) -> &UserBase {
    &self.base
  }

  pub fn password(&self) -> &str {
    &self.password
  }
}

impl fmt::Debug for UserCreate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UserCreate")
      .field("base", &self.base)
      .field("password", &"<redacted>")
      .finish()
  }
}

impl Schema for UserCreate {
  const NAME: &'static str = "UserCreate";

  fn read(reader: &mut FieldReader<'_>) -> Option<Self> {
    let base = UserBase::read(reader);
    let password = reader.required_string("password");
    Some(Self::new(base?, password?))
  }

  fn to_map(&self) -> Map<String, Value> {
    let mut map = self.base.to_map();
    map.insert("password".into(), Value::from(self.password.clone()));
    map
  }
}

/// Payload for updating a user.
///
/// Base fields keep their create-time requiredness; which fields the caller
/// actually supplied is remembered so that only those are applied. Equality
/// compares the values only, not which fields were supplied.
#[derive(Clone)]
pub struct UserUpdate {
  base: UserBase,
  password: Option<String>,
  fields_set: Vec<&'static str>,
}

impl UserUpdate {
  const BASE_FIELDS: [&'static str; 5] = ["email", "is_active", "is_superuser", "full_name", "roles"];

  /// Every base field counts as set, plus `password` when given.
  pub fn new(base: UserBase, password: Option<String>) -> Self {
    let mut fields_set = Self::BASE_FIELDS.to_vec();
    if password.is_some() {
      fields_set.push("password");
    }
    Self {
      base,
      password,
      fields_set,
    }
  }

  pub fn base(&self) -> &UserBase {
    &self.base
  }

  pub fn password(&self) -> Option<&str> {
    self.password.as_deref()
  }

  pub fn fields_set(&self) -> &[&'static str] {
    &self.fields_set
  }

  pub fn is_set(&self, field: &str) -> bool {
    self.fields_set.iter().any(|f| *f == field)
  }
}

impl PartialEq for UserUpdate {
  fn eq(&self, other: &Self) -> bool {
    self.base == other.base && self.password == other.password
  }
}

impl Eq for UserUpdate {}

impl fmt::Debug for UserUpdate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UserUpdate")
      .field("base", &self.base)
      .field("password", &self.password.as_ref().map(|_| "<redacted>"))
      .field("fields_set", &self.fields_set)
      .finish()
  }
}

impl Schema for UserUpdate {
  const NAME: &'static str = "UserUpdate";

  fn read(reader: &mut FieldReader<'_>) -> Option<Self> {
    let base = UserBase::read(reader);
    let password = reader.optional_string("password");
    Some(Self {
      base: base?,
      password,
      fields_set: reader.fields_set().to_vec(),
    })
  }

  fn to_map(&self) -> Map<String, Value> {
    let mut map = self.base.to_map();
    map.insert("password".into(), optional_value(self.password.clone()));
    map
  }
}

/// Read model returned to clients: base fields plus persistence-assigned identity
/// and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
  base: UserBase,
  id: i32,
  created_at: DateTime<Utc>,
  updated_at: Option<DateTime<Utc>>,
}

impl User {
  pub fn new(base: UserBase, id: i32, created_at: DateTime<Utc>) -> Self {
    Self {
      base,
      id,
      created_at,
      updated_at: None,
    }
  }

  pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
    self.updated_at = Some(updated_at);
    self
  }

  pub fn base(&self) -> &UserBase {
    &self.base
  }

  pub fn email(&self) -> &str {
    self.base.email()
  }

  pub fn id(&self) -> i32 {
    self.id
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  pub fn updated_at(&self) -> Option<DateTime<Utc>> {
    self.updated_at
  }
}

impl Schema for User {
  const NAME: &'static str = "User";

  fn read(reader: &mut FieldReader<'_>) -> Option<Self> {
    let base = UserBase::read(reader);
    let id = reader.required_i32("id");
    let created_at = reader.required_timestamp("created_at");
    let updated_at = reader.optional_timestamp("updated_at");
    Some(Self {
      base: base?,
      id: id?,
      created_at: created_at?,
      updated_at,
    })
  }

  fn to_map(&self) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("id".into(), Value::from(self.id));
    self.base.write_into(&mut map);
    map.insert("created_at".into(), timestamp_value(&self.created_at));
    map.insert(
      "updated_at".into(),
      self.updated_at.as_ref().map(timestamp_value).unwrap_or(Value::Null),
    );
    map
  }
}

crate::impl_schema_serde!(UserBase, UserCreate, UserUpdate, User);

/// The read model together with the stored password hash. Internal only; never
/// serialized into a response.
#[derive(Clone, PartialEq, Eq)]
pub struct UserInDb {
  user: User,
  hashed_password: String,
}

impl UserInDb {
  pub fn new(user: User, hashed_password: impl Into<String>) -> Self {
    Self {
      user,
      hashed_password: hashed_password.into(),
    }
  }

  pub fn user(&self) -> &User {
    &self.user
  }

  pub fn hashed_password(&self) -> &str {
    &self.hashed_password
  }

  pub fn into_user(self) -> User {
    self.user
  }
}

impl fmt::Debug for UserInDb {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UserInDb")
      .field("user", &self.user)
      .field("hashed_password", &"<redacted>")
      .finish()
  }
}
