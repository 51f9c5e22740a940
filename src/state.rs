use std::sync::Arc;

use crate::config::AppConfig;
use crate::fixture::Fixture;
use crate::identity::{IdentityProvider, PgIdentityProvider};
use crate::store::{GoogleSheetsStore, RowStore};

/// Collaborators shared by every request
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn RowStore>,
}

impl AppState {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn RowStore>) -> Self {
        Self { identity, store }
    }

    /// Wire collaborators from configuration: the YAML fixture when one is
    /// configured, otherwise the account database and Google Sheets.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        if let Some(path) = config.fixture.path.as_deref() {
            tracing::info!("Serving tables from fixture {}", path);
            return Ok(Fixture::load(path)?.into_state());
        }

        let identity = PgIdentityProvider::connect_lazy(&config.identity)?;
        let store = GoogleSheetsStore::new(&config.store)?;
        Ok(Self::new(Arc::new(identity), Arc::new(store)))
    }
}
