use serde_json::json;
use sqlx::PgPool;
use user_schemas::{
  domains::user::{
    repository::SqlxUserRepository,
    service::{UserService, UserServiceError, UserServiceImpl},
  },
  Schema, UserCreate, UserUpdate,
};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at a Postgres instance"]
async fn create_update_delete_round_trip(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
  let service = UserServiceImpl::new(SqlxUserRepository::new(pool));

  let create = UserCreate::from_value(json!({
    "email": "pg@example.com",
    "password": "password123",
    "roles": ["operator"],
  }))?;
  let user = service.create_user(create).await?;
  assert_eq!(user.email(), "pg@example.com");
  assert_eq!(user.base().roles(), ["operator".to_string()]);
  assert!(user.updated_at().is_none());

  let update = UserUpdate::from_value(json!({ "email": "pg@example.com", "full_name": "Postgres User" }))?;
  let updated = service.update_user(user.id(), update).await?;
  assert_eq!(updated.base().full_name(), Some("Postgres User"));
  assert_eq!(updated.base().roles(), ["operator".to_string()]);
  assert!(updated.updated_at().is_some());

  let fetched = service.get_user_by_email("pg@example.com").await?;
  assert_eq!(fetched, updated);

  let deleted = service.delete_user(user.id()).await?;
  assert_eq!(deleted.id(), user.id());
  assert!(matches!(service.get_user(user.id()).await, Err(UserServiceError::NotFound(_))));

  Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL pointing at a Postgres instance"]
async fn duplicate_email_is_a_conflict(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
  let service = UserServiceImpl::new(SqlxUserRepository::new(pool));

  let create = UserCreate::from_value(json!({ "email": "dup@example.com", "password": "pw" }))?;
  service.create_user(create.clone()).await?;

  let result = service.create_user(create).await;
  assert!(matches!(result, Err(UserServiceError::Conflict(_))));
  Ok(())
}
