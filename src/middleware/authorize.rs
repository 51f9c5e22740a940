use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::identity::Verdict;
use crate::state::AppState;
use crate::types::{Locator, StoreLocator};

/// A request that passed every authorization step
#[derive(Debug, Clone)]
pub struct AuthorizedTable {
    pub locator: Locator,
    pub store_locator: StoreLocator,
}

/// Short, non-reversible tag for an API key, safe to log
pub fn key_fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{:x}", digest)[..12].to_string()
}

/// Run the authorization chain for one request, in order:
/// key present, path shaped /user/project/table, project owned by user,
/// key belongs to user, project has a sheet, sheet has the table.
///
/// The first failing step decides the error. Denials map to 4xx and lookup
/// failures to 500.
pub async fn authorize(state: &AppState, key: Option<&str>, path: &str) -> Result<AuthorizedTable, ApiError> {
    let key = key.filter(|k| !k.is_empty()).ok_or(ApiError::MissingKey)?;

    let locator = Locator::from_path(path).ok_or_else(|| {
        debug!("Rejecting malformed path: {}", path);
        ApiError::MalformedPath
    })?;

    let Locator { username, project, table } = &locator;

    match state.identity.verify_project_exists(username, project).await? {
        Verdict::Confirmed(()) => {}
        Verdict::Denied => {
            warn!("Unknown user or project: {}/{}", username, project);
            return Err(ApiError::not_found("User or project does not exists"));
        }
    }

    match state.identity.verify_key(username, key).await? {
        Verdict::Confirmed(()) => {}
        Verdict::Denied => {
            warn!("Invalid key {} for user {}", key_fingerprint(key), username);
            return Err(ApiError::Unauthorized);
        }
    }

    let store_locator = match state.identity.resolve_store_locator(username, project).await? {
        Verdict::Confirmed(store_locator) => store_locator,
        Verdict::Denied => {
            warn!("Project {}/{} has no sheet configured", username, project);
            return Err(ApiError::not_found(format!("No sheet_id specified for project {}", project)));
        }
    };

    if !state.store.table_exists(&store_locator, table).await? {
        warn!("Table '{}' missing from document {}", table, store_locator);
        return Err(ApiError::not_found(format!(
            "Sheet '{}' does not exists in document '{}'",
            table, project
        )));
    }

    debug!("Authorized {}/{}/{} -> {}", username, project, table, store_locator);
    Ok(AuthorizedTable { locator, store_locator })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentityProvider;
    use crate::store::MemoryStore;
    use axum::http::StatusCode;
    use std::sync::Arc;

    fn state() -> (Arc<MemoryIdentityProvider>, Arc<MemoryStore>, AppState) {
        let identity = Arc::new(MemoryIdentityProvider::new());
        identity.add_user("alice", "K1");
        identity.add_project("alice", "proj1", Some(StoreLocator::new("doc-1")));
        identity.add_project("alice", "empty", None);
        identity.add_user("bob", "K2");

        let store = Arc::new(MemoryStore::new());
        store.put_table("doc-1", "tasks", vec![vec!["title", "done"]]);

        let state = AppState::new(identity.clone(), store.clone());
        (identity, store, state)
    }

    async fn status(state: &AppState, key: Option<&str>, path: &str) -> Option<StatusCode> {
        authorize(state, key, path).await.err().map(|e| e.status_code())
    }

    #[tokio::test]
    async fn accepts_owned_table() {
        let (_, _, state) = state();
        let table = authorize(&state, Some("K1"), "alice/proj1/tasks").await.unwrap();
        assert_eq!(table.locator.table, "tasks");
        assert_eq!(table.store_locator, StoreLocator::new("doc-1"));
    }

    #[tokio::test]
    async fn key_is_checked_before_path() {
        let (_, _, state) = state();
        assert!(matches!(authorize(&state, None, "bad").await, Err(ApiError::MissingKey)));
        assert!(matches!(authorize(&state, Some(""), "alice/proj1/tasks").await, Err(ApiError::MissingKey)));
        assert!(matches!(authorize(&state, Some("K1"), "alice/proj1").await, Err(ApiError::MalformedPath)));
    }

    #[tokio::test]
    async fn each_step_has_its_own_failure() {
        let (_, _, state) = state();
        assert_eq!(status(&state, Some("K1"), "alice/nope/tasks").await, Some(StatusCode::NOT_FOUND));
        assert_eq!(status(&state, Some("K2"), "alice/proj1/tasks").await, Some(StatusCode::UNAUTHORIZED));
        assert_eq!(status(&state, Some("K1"), "alice/empty/tasks").await, Some(StatusCode::NOT_FOUND));
        assert_eq!(status(&state, Some("K1"), "alice/proj1/notes").await, Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn project_check_precedes_key_check() {
        let (_, _, state) = state();
        // wrong key and unknown project: the project lookup answers first
        let err = authorize(&state, Some("nope"), "alice/nope/tasks").await.unwrap_err();
        assert_eq!(err.to_string(), "User or project does not exists");
    }

    #[tokio::test]
    async fn lookup_failures_are_internal_errors() {
        let (identity, store, state) = state();
        identity.set_unavailable(true);
        assert!(matches!(authorize(&state, Some("K1"), "alice/proj1/tasks").await, Err(ApiError::Upstream(_))));

        identity.set_unavailable(false);
        store.set_unavailable(true);
        assert!(matches!(authorize(&state, Some("K1"), "alice/proj1/tasks").await, Err(ApiError::Upstream(_))));
    }

    #[test]
    fn fingerprint_hides_key() {
        let fp = key_fingerprint("K1");
        assert_eq!(fp.len(), 12);
        assert!(!fp.contains("K1"));
        assert_eq!(fp, key_fingerprint("K1"));
    }
}
