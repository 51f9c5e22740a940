// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A table row: attribute name to cell value
pub type Row = BTreeMap<String, String>;

/// Where a request points: /{username}/{project}/{table}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub username: String,
    pub project: String,
    pub table: String,
}

impl Locator {
    /// Decompose a request path into exactly three non-empty segments.
    /// A leading slash and a single trailing slash are tolerated.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let path = path.strip_suffix('/').unwrap_or(path);

        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            [username, project, table]
                if !username.is_empty() && !project.is_empty() && !table.is_empty() =>
            {
                Some(Self {
                    username: username.to_string(),
                    project: project.to_string(),
                    table: table.to_string(),
                })
            }
            _ => None,
        }
    }
}

/// Identifier of the backing spreadsheet document for a project
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreLocator(String);

impl StoreLocator {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
