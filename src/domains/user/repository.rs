use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use thiserror::Error;

use super::record::UserRecord;

const USER_COLUMNS: &str =
  "id, email, full_name, hashed_password, is_active, is_superuser, roles, created_at, updated_at";

#[derive(Debug, Error)]
pub enum RepositoryError {
  #[error("database error: {0}")]
  DatabaseError(#[from] sqlx::Error),
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Conflict(String),
}

/// Values for a new `users` row. The password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
  pub email: String,
  pub full_name: Option<String>,
  pub hashed_password: String,
  pub is_active: bool,
  pub is_superuser: bool,
  pub roles: Vec<String>,
}

/// Column changes for an update. `None` leaves the column untouched;
/// `full_name: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
  pub email: Option<String>,
  pub full_name: Option<Option<String>>,
  pub hashed_password: Option<String>,
  pub is_active: Option<bool>,
  pub is_superuser: Option<bool>,
  pub roles: Option<Vec<String>>,
}

impl UserChanges {
  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
  async fn create(&self, user: NewUser) -> Result<UserRecord, RepositoryError>;
  async fn find_by_id(&self, id: i32) -> Result<Option<UserRecord>, RepositoryError>;
  async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;
  async fn list(&self, skip: i64, limit: i64) -> Result<Vec<UserRecord>, RepositoryError>;
  async fn update(&self, id: i32, changes: UserChanges) -> Result<UserRecord, RepositoryError>;
  async fn delete(&self, id: i32) -> Result<Option<UserRecord>, RepositoryError>;
}

pub struct SqlxUserRepository {
  pub pool: PgPool,
}

impl SqlxUserRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

fn map_write_error(err: sqlx::Error, email: Option<&str>) -> RepositoryError {
  if let sqlx::Error::Database(db_err) = &err {
    if db_err.is_unique_violation() {
      let email = email.unwrap_or("<unchanged>");
      tracing::warn!("Unique violation writing user with email {}", email);
      return RepositoryError::Conflict(format!("A user with email '{}' already exists", email));
    }
  }
  RepositoryError::DatabaseError(err)
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
  async fn create(&self, user: NewUser) -> Result<UserRecord, RepositoryError> {
    let sql = format!(
      "INSERT INTO users (email, full_name, hashed_password, is_active, is_superuser, roles) \
       VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
      USER_COLUMNS
    );

    let record = sqlx::query_as::<_, UserRecord>(&sql)
      .bind(&user.email)
      .bind(&user.full_name)
      .bind(&user.hashed_password)
      .bind(user.is_active)
      .bind(user.is_superuser)
      .bind(Json(&user.roles))
      .fetch_one(&self.pool)
      .await
      .map_err(|e| map_write_error(e, Some(user.email.as_str())))?;

    tracing::info!("Created user {}", record.id);
    Ok(record)
  }

  async fn find_by_id(&self, id: i32) -> Result<Option<UserRecord>, RepositoryError> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    let record = sqlx::query_as::<_, UserRecord>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(record)
  }

  async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
    let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
    let record = sqlx::query_as::<_, UserRecord>(&sql)
      .bind(email)
      .fetch_optional(&self.pool)
      .await?;
    Ok(record)
  }

  async fn list(&self, skip: i64, limit: i64) -> Result<Vec<UserRecord>, RepositoryError> {
    let sql = format!("SELECT {} FROM users ORDER BY id OFFSET $1 LIMIT $2", USER_COLUMNS);
    let records = sqlx::query_as::<_, UserRecord>(&sql)
      .bind(skip)
      .bind(limit)
      .fetch_all(&self.pool)
      .await?;
    Ok(records)
  }

  async fn update(&self, id: i32, changes: UserChanges) -> Result<UserRecord, RepositoryError> {
    let email = changes.email.clone();

    let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
    let mut set = builder.separated(", ");
    if let Some(email) = changes.email {
      set.push("email = ").push_bind_unseparated(email);
    }
    if let Some(full_name) = changes.full_name {
      set.push("full_name = ").push_bind_unseparated(full_name);
    }
    if let Some(hashed_password) = changes.hashed_password {
      set.push("hashed_password = ").push_bind_unseparated(hashed_password);
    }
    if let Some(is_active) = changes.is_active {
      set.push("is_active = ").push_bind_unseparated(is_active);
    }
    if let Some(is_superuser) = changes.is_superuser {
      set.push("is_superuser = ").push_bind_unseparated(is_superuser);
    }
    if let Some(roles) = changes.roles {
      set.push("roles = ").push_bind_unseparated(Json(roles));
    }
    set.push("updated_at = NOW()");
    builder.push(" WHERE id = ").push_bind(id);
    builder.push(" RETURNING ").push(USER_COLUMNS);

    let record = builder
      .build_query_as::<UserRecord>()
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| map_write_error(e, email.as_deref()))?
      .ok_or_else(|| RepositoryError::NotFound(format!("User {} not found", id)))?;

    tracing::info!("Updated user {}", record.id);
    Ok(record)
  }

  async fn delete(&self, id: i32) -> Result<Option<UserRecord>, RepositoryError> {
    let sql = format!("DELETE FROM users WHERE id = $1 RETURNING {}", USER_COLUMNS);
    let record = sqlx::query_as::<_, UserRecord>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;

    if record.is_some() {
      tracing::info!("Deleted user {}", id);
    }
    Ok(record)
  }
}
