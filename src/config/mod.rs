use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    pub store: StoreConfig,
    pub fixture: FixtureConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub api_base: String,
    pub token_url: String,
    pub client_email: Option<String>,
    #[serde(skip_serializing)]
    pub private_key: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureConfig {
    pub path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        AppConfig::development().server
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        AppConfig::development().store
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(|name| env::var(name).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        // Server overrides
        if let Some(v) = var("SHEETS_API_HOST") {
            self.server.host = v;
        }
        if let Some(v) = var("SHEETS_API_PORT").or_else(|| var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = var("SERVER_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }
        if let Some(v) = var("SERVER_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging = v.parse().unwrap_or(self.server.enable_request_logging);
        }
        if let Some(v) = var("SERVER_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Identity database overrides
        if let Some(v) = var("DATABASE_URL") {
            self.identity.database_url = Some(v);
        }
        if let Some(v) = var("DATABASE_MAX_CONNECTIONS") {
            self.identity.max_connections = v.parse().unwrap_or(self.identity.max_connections);
        }
        if let Some(v) = var("DATABASE_CONNECTION_TIMEOUT") {
            self.identity.connection_timeout = v.parse().unwrap_or(self.identity.connection_timeout);
        }

        // Spreadsheet store overrides
        if let Some(v) = var("SHEETS_API_BASE") {
            self.store.api_base = v;
        }
        if let Some(v) = var("GOOGLE_TOKEN_URL") {
            self.store.token_url = v;
        }
        if let Some(v) = var("GOOGLE_CLIENT_EMAIL") {
            self.store.client_email = Some(v);
        }
        if let Some(v) = var("GOOGLE_PRIVATE_KEY") {
            // Keys pasted into .env files usually carry literal \n sequences
            self.store.private_key = Some(v.replace("\\n", "\n"));
        }
        if let Some(v) = var("GOOGLE_ACCESS_TOKEN") {
            self.store.access_token = Some(v);
        }
        if let Some(v) = var("STORE_REQUEST_TIMEOUT_SECS") {
            self.store.request_timeout_secs = v.parse().unwrap_or(self.store.request_timeout_secs);
        }

        if let Some(v) = var("FIXTURE_PATH") {
            self.fixture.path = Some(v);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                enable_cors: true,
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            identity: IdentityConfig {
                database_url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            store: StoreConfig::google_defaults(60),
            fixture: FixtureConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                enable_cors: true,
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            identity: IdentityConfig {
                database_url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            store: StoreConfig::google_defaults(30),
            fixture: FixtureConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                enable_cors: true,
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            identity: IdentityConfig {
                database_url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            store: StoreConfig::google_defaults(15),
            fixture: FixtureConfig::default(),
        }
    }

    /// Default log filter when RUST_LOG is not set
    pub fn default_log_filter(&self) -> &'static str {
        match self.environment {
            Environment::Production => "info",
            Environment::Staging | Environment::Development => "debug",
        }
    }
}

impl StoreConfig {
    fn google_defaults(request_timeout_secs: u64) -> Self {
        Self {
            api_base: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            client_email: None,
            private_key: None,
            access_token: None,
            request_timeout_secs,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 3000);
        assert!(config.server.enable_request_logging);
        assert_eq!(config.default_log_filter(), "debug");
        assert!(config.fixture.path.is_none());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.server.enable_request_logging);
        assert_eq!(config.server.max_request_size_bytes, 2 * 1024 * 1024);
        assert_eq!(config.default_log_filter(), "info");
    }

    #[test]
    fn overrides_apply_on_top_of_profile() {
        let config = AppConfig::development().with_overrides(vars(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/accounts"),
            ("GOOGLE_PRIVATE_KEY", "-----BEGIN-----\\nabc\\n-----END-----"),
            ("FIXTURE_PATH", "fixtures/demo.yaml"),
        ]));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.identity.database_url.as_deref(), Some("postgres://localhost/accounts"));
        assert_eq!(
            config.store.private_key.as_deref(),
            Some("-----BEGIN-----\nabc\n-----END-----")
        );
        assert_eq!(config.fixture.path.as_deref(), Some("fixtures/demo.yaml"));
    }

    #[test]
    fn specific_port_wins_and_bad_values_are_ignored() {
        let config = AppConfig::development().with_overrides(vars(&[
            ("SHEETS_API_PORT", "4000"),
            ("PORT", "5000"),
            ("DATABASE_MAX_CONNECTIONS", "lots"),
        ]));
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.identity.max_connections, 5);
    }
}
