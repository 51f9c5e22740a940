//! Identity collaborator: who owns which project, which key belongs to whom,
//! and which spreadsheet backs a project.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::StoreLocator;

pub use memory::MemoryIdentityProvider;
pub use postgres::PgIdentityProvider;

/// Outcome of a lookup that completed. A failed lookup is an `IdentityError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<T> {
    /// The provider confirmed the resource, with its value
    Confirmed(T),
    /// The provider answered authoritatively that the resource is absent or mismatched
    Denied,
}

impl<T> Verdict<T> {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Verdict::Confirmed(_))
    }
}

pub type LookupResult<T> = Result<Verdict<T>, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Does `project` exist and belong to `username`?
    async fn verify_project_exists(&self, username: &str, project: &str) -> LookupResult<()>;

    /// Is `key` the API key of `username`?
    async fn verify_key(&self, username: &str, key: &str) -> LookupResult<()>;

    /// Spreadsheet document configured for the project
    async fn resolve_store_locator(&self, username: &str, project: &str) -> LookupResult<StoreLocator>;

    /// Connectivity probe used by /health
    async fn health_check(&self) -> Result<(), IdentityError> {
        Ok(())
    }
}
