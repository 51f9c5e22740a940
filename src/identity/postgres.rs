use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

use crate::config::IdentityConfig;
use crate::types::StoreLocator;

use super::{IdentityError, IdentityProvider, LookupResult, Verdict};

/// Identity provider backed by the account database.
///
/// The database exposes three SQL functions:
/// - `user_project_check(uname, pname) -> boolean`
/// - `verify_user_key(uname, key) -> boolean`
/// - `get_user_project_id(pname, uname) -> text` (the project's sheet id)
pub struct PgIdentityProvider {
    pool: PgPool,
}

impl PgIdentityProvider {
    /// Build a lazily connecting pool; nothing is dialed until the first lookup
    pub fn connect_lazy(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or(IdentityError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_lazy(database_url)?;

        info!("Configured identity database pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn check(&self, sql: &str, first: &str, second: &str) -> LookupResult<()> {
        let confirmed: Option<bool> = sqlx::query_scalar(sql)
            .bind(first)
            .bind(second)
            .fetch_one(&self.pool)
            .await?;

        Ok(match confirmed {
            Some(true) => Verdict::Confirmed(()),
            _ => Verdict::Denied,
        })
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn verify_project_exists(&self, username: &str, project: &str) -> LookupResult<()> {
        self.check("SELECT user_project_check($1, $2)", username, project)
            .await
    }

    async fn verify_key(&self, username: &str, key: &str) -> LookupResult<()> {
        self.check("SELECT verify_user_key($1, $2)", username, key)
            .await
    }

    async fn resolve_store_locator(&self, username: &str, project: &str) -> LookupResult<StoreLocator> {
        let sheet_id: Option<String> = sqlx::query_scalar("SELECT get_user_project_id($1, $2)")
            .bind(project)
            .bind(username)
            .fetch_one(&self.pool)
            .await?;

        Ok(match sheet_id {
            Some(id) if !id.trim().is_empty() => Verdict::Confirmed(StoreLocator::new(id)),
            _ => Verdict::Denied,
        })
    }

    async fn health_check(&self) -> Result<(), IdentityError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
