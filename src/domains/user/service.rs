use async_trait::async_trait;
use thiserror::Error;

use super::{
  model::{User, UserCreate, UserUpdate},
  record::UserRecord,
  repository::{NewUser, UserChanges, UserRepository},
  validation::ValidationError,
};
use crate::utils::hash_password;

pub const DEFAULT_LIST_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum UserServiceError {
  #[error("Validation Error: {0}")]
  Validation(#[from] ValidationError),
  #[error("Not Found: {0}")]
  NotFound(String),
  #[error("Conflict: {0}")]
  Conflict(String),
  #[error("Internal Server Error: {0}")]
  InternalServerError(String),
}

crate::impl_service_error_conversions!(UserServiceError, InternalServerError, NotFound, Conflict);

#[async_trait]
pub trait UserService: Send + Sync {
  async fn create_user(&self, req: UserCreate) -> Result<User, UserServiceError>;
  async fn get_user(&self, id: i32) -> Result<User, UserServiceError>;
  async fn get_user_by_email(&self, email: &str) -> Result<User, UserServiceError>;
  async fn list_users(&self, skip: u32, limit: Option<u32>) -> Result<Vec<User>, UserServiceError>;
  async fn update_user(&self, id: i32, req: UserUpdate) -> Result<User, UserServiceError>;
  async fn delete_user(&self, id: i32) -> Result<User, UserServiceError>;
}

pub struct UserServiceImpl<U> {
  user_repository: U,
}

impl<U> UserServiceImpl<U>
where
  U: UserRepository,
{
  pub fn new(user_repository: U) -> Self {
    Self { user_repository }
  }
}

/// Adapts a stored row into the read model. A row that no longer satisfies the
/// schema is a server-side fault, not a client error.
fn to_user(record: &UserRecord) -> Result<User, UserServiceError> {
  User::try_from(record).map_err(|e| {
    tracing::error!("Stored user {} failed validation: {}", record.id, e);
    UserServiceError::InternalServerError(format!("Stored user {} is invalid", record.id))
  })
}

fn hash(password: &str) -> Result<String, UserServiceError> {
  hash_password(password).map_err(|e| {
    tracing::error!("Failed to hash password: {}", e);
    UserServiceError::InternalServerError("Failed to hash password".to_string())
  })
}

fn not_found(id: i32) -> UserServiceError {
  UserServiceError::NotFound(format!("User {} not found", id))
}

/// Collects the columns an update actually touches. Only fields the caller supplied
/// are included; an empty password is ignored, any other is hashed.
pub fn changes_from_update(req: &UserUpdate) -> Result<UserChanges, UserServiceError> {
  let base = req.base();
  let mut changes = UserChanges::default();

  if req.is_set("email") {
    changes.email = Some(base.email().to_string());
  }
  if req.is_set("full_name") {
    changes.full_name = Some(base.full_name().map(str::to_string));
  }
  if req.is_set("is_active") {
    changes.is_active = Some(base.is_active());
  }
  if req.is_set("is_superuser") {
    changes.is_superuser = Some(base.is_superuser());
  }
  if req.is_set("roles") {
    changes.roles = Some(base.roles().to_vec());
  }
  if let Some(password) = req.password().filter(|p| !p.is_empty()) {
    changes.hashed_password = Some(hash(password)?);
  }

  Ok(changes)
}

#[async_trait]
impl<U> UserService for UserServiceImpl<U>
where
  U: UserRepository,
{
  async fn create_user(&self, req: UserCreate) -> Result<User, UserServiceError> {
    let base = req.base();

    if self.user_repository.find_by_email(base.email()).await?.is_some() {
      return Err(UserServiceError::Conflict(format!(
        "A user with email '{}' already exists",
        base.email()
      )));
    }

    let new_user = NewUser {
      email: base.email().to_string(),
      full_name: base.full_name().map(str::to_string),
      hashed_password: hash(req.password())?,
      is_active: base.is_active(),
      is_superuser: base.is_superuser(),
      roles: base.roles().to_vec(),
    };

    let record = self.user_repository.create(new_user).await?;
    to_user(&record)
  }

  async fn get_user(&self, id: i32) -> Result<User, UserServiceError> {
    let record = self.user_repository.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
    to_user(&record)
  }

  async fn get_user_by_email(&self, email: &str) -> Result<User, UserServiceError> {
    let record = self
      .user_repository
      .find_by_email(email)
      .await?
      .ok_or_else(|| UserServiceError::NotFound(format!("User with email '{}' not found", email)))?;
    to_user(&record)
  }

  async fn list_users(&self, skip: u32, limit: Option<u32>) -> Result<Vec<User>, UserServiceError> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let records = self.user_repository.list(i64::from(skip), i64::from(limit)).await?;
    records.iter().map(to_user).collect()
  }

  async fn update_user(&self, id: i32, req: UserUpdate) -> Result<User, UserServiceError> {
    let existing = self.user_repository.find_by_id(id).await?.ok_or_else(|| not_found(id))?;

    let changes = changes_from_update(&req)?;
    if changes.is_empty() {
      return to_user(&existing);
    }

    if let Some(email) = changes.email.as_deref().filter(|e| *e != existing.email) {
      if self.user_repository.find_by_email(email).await?.is_some() {
        return Err(UserServiceError::Conflict(format!(
          "A user with email '{}' already exists",
          email
        )));
      }
    }

    let record = self.user_repository.update(id, changes).await?;
    to_user(&record)
  }

  async fn delete_user(&self, id: i32) -> Result<User, UserServiceError> {
    let record = self.user_repository.delete(id).await?.ok_or_else(|| not_found(id))?;
    to_user(&record)
  }
}
