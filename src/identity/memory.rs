use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::types::StoreLocator;

use super::{IdentityError, IdentityProvider, LookupResult, Verdict};

#[derive(Debug, Clone, Default)]
struct Account {
    api_key: String,
    /// project name -> sheet id (None when the project has no sheet yet)
    projects: HashMap<String, Option<StoreLocator>>,
}

/// In-process identity provider for fixture mode and tests
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    unavailable: AtomicBool,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: impl Into<String>, api_key: impl Into<String>) {
        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        accounts
            .entry(username.into())
            .or_default()
            .api_key = api_key.into();
    }

    /// Register a project for an existing or new user
    pub fn add_project(
        &self,
        username: impl Into<String>,
        project: impl Into<String>,
        sheet_id: Option<StoreLocator>,
    ) {
        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        accounts
            .entry(username.into())
            .or_default()
            .projects
            .insert(project.into(), sheet_id);
    }

    /// Simulate the provider being unreachable; every lookup then fails
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn with_account<T>(&self, username: &str, f: impl FnOnce(Option<&Account>) -> T) -> Result<T, IdentityError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("memory identity provider offline".to_string()));
        }
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        Ok(f(accounts.get(username)))
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn verify_project_exists(&self, username: &str, project: &str) -> LookupResult<()> {
        self.with_account(username, |account| match account {
            Some(account) if account.projects.contains_key(project) => Verdict::Confirmed(()),
            _ => Verdict::Denied,
        })
    }

    async fn verify_key(&self, username: &str, key: &str) -> LookupResult<()> {
        self.with_account(username, |account| match account {
            Some(account) if !account.api_key.is_empty() && account.api_key == key => {
                Verdict::Confirmed(())
            }
            _ => Verdict::Denied,
        })
    }

    async fn resolve_store_locator(&self, username: &str, project: &str) -> LookupResult<StoreLocator> {
        self.with_account(username, |account| {
            match account.and_then(|a| a.projects.get(project)).cloned().flatten() {
                Some(locator) => Verdict::Confirmed(locator),
                None => Verdict::Denied,
            }
        })
    }

    async fn health_check(&self) -> Result<(), IdentityError> {
        self.with_account("", |_| ())
    }
}
