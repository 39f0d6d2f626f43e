use std::env;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
  pub url: String,
  pub max_connections: u32,
}

impl DatabaseConfig {
  /// Reads `DATABASE_URL` and `DATABASE_MAX_CONNECTIONS`, loading `.env` first if present.
  pub fn from_env() -> anyhow::Result<Self> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|key| env::var(key).ok())
  }

  fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
    let url = lookup("DATABASE_URL").context("DATABASE_URL environment variable must be set")?;
    let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
      Some(raw) => raw
        .parse::<u32>()
        .with_context(|| format!("DATABASE_MAX_CONNECTIONS must be a positive integer, got {:?}", raw))?,
      None => DEFAULT_MAX_CONNECTIONS,
    };

    Ok(Self { url, max_connections })
  }
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
  PgPoolOptions::new()
    .max_connections(config.max_connections)
    .connect(&config.url)
    .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
  sqlx::migrate!("./migrations").run(pool).await?;
  tracing::info!("Database migrations applied successfully");
  Ok(())
}
