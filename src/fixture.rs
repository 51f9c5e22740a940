//! YAML fixture that seeds the in-memory collaborators.
//!
//! ```yaml
//! users:
//!   - username: alice
//!     api_key: K1
//!     projects:
//!       - name: proj1
//!         sheet_id: doc-1
//! documents:
//!   doc-1:
//!     tasks:
//!       - [title, done]
//!       - [write docs, "true"]
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::identity::MemoryIdentityProvider;
use crate::state::AppState;
use crate::store::MemoryStore;
use crate::types::StoreLocator;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Cannot read fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<FixtureUser>,
    /// sheet id -> table name -> rows (header first)
    #[serde(default)]
    pub documents: HashMap<String, HashMap<String, Vec<Vec<String>>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureUser {
    pub username: String,
    pub api_key: String,
    #[serde(default)]
    pub projects: Vec<FixtureProject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureProject {
    pub name: String,
    pub sheet_id: Option<String>,
}

impl Fixture {
    pub fn load(path: &str) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, FixtureError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn build(&self) -> (Arc<MemoryIdentityProvider>, Arc<MemoryStore>) {
        let identity = MemoryIdentityProvider::new();
        for user in &self.users {
            identity.add_user(&user.username, &user.api_key);
            for project in &user.projects {
                let sheet = project.sheet_id.clone().map(StoreLocator::new);
                identity.add_project(&user.username, &project.name, sheet);
            }
        }

        let store = MemoryStore::new();
        for (sheet_id, tables) in &self.documents {
            for (table, values) in tables {
                store.put_table(sheet_id, table, values.clone());
            }
        }

        (Arc::new(identity), Arc::new(store))
    }

    pub fn into_state(self) -> AppState {
        let (identity, store) = self.build();
        AppState::new(identity, store)
    }
}
