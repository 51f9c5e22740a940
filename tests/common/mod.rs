#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use tokio::task::JoinHandle;

use sheets_api_rust::config::ServerConfig;
use sheets_api_rust::fixture::Fixture;
use sheets_api_rust::identity::MemoryIdentityProvider;
use sheets_api_rust::state::AppState;
use sheets_api_rust::store::MemoryStore;

/// alice owns proj1 (sheet doc-1) and draft (no sheet); bob owns nothing
pub const FIXTURE: &str = r#"
users:
  - username: alice
    api_key: K1
    projects:
      - name: proj1
        sheet_id: doc-1
      - name: draft
  - username: bob
    api_key: K2
documents:
  doc-1:
    tasks:
      - [title, done, owner]
      - [write spec, "true", alice]
      - [review, "false", bob]
      - [ship, "true", bob]
      - [plan, "false", ""]
    broken: []
"#;

/// A router on its own port, backed by in-memory collaborators.
/// Every test gets a fresh server so writes do not leak between tests.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub identity: Arc<MemoryIdentityProvider>,
    pub store: Arc<MemoryStore>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let (identity, store) = Fixture::from_yaml_str(FIXTURE)?.build();
        let state = AppState::new(identity.clone(), store.clone());
        let app = sheets_api_rust::app(state, &ServerConfig::default());

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            port,
            base_url,
            identity,
            store,
            handle,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Raw values of a fixture table, header first
    pub fn table(&self, table: &str) -> Vec<Vec<String>> {
        self.store.snapshot("doc-1", table).unwrap_or_default()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn start_server() -> Result<TestServer> {
    let server = TestServer::spawn().await?;
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

/// Column of a JSON row array, for order-sensitive assertions
pub fn column(rows: &serde_json::Value, attribute: &str) -> Vec<String> {
    rows.as_array()
        .map(|rows| {
            rows.iter()
                .map(|r| r.get(attribute).and_then(|v| v.as_str()).unwrap_or("").to_string())
                .collect()
        })
        .unwrap_or_default()
}
