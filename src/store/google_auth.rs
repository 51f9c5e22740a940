use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::StoreConfig;

use super::StoreError;

const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion claims for the service account token exchange
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl AssertionClaims {
    pub fn new(client_email: &str, token_url: &str, now: DateTime<Utc>) -> Self {
        Self {
            iss: client_email.to_string(),
            scope: SCOPE.to_string(),
            aud: token_url.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: i64,
}

fn default_expiry() -> i64 {
    3600
}

#[derive(Debug, Clone)]
pub struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Supplies bearer tokens for the Sheets API.
///
/// Service account tokens are cached and refreshed a minute before they
/// expire, so one token serves many requests.
pub enum AccessTokenSource {
    /// Pre-issued token, used as is
    Static(String),
    ServiceAccount {
        client_email: String,
        key: EncodingKey,
        token_url: String,
        cached: Mutex<Option<CachedToken>>,
    },
}

impl AccessTokenSource {
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        if let Some(token) = config.access_token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(Self::Static(token.clone()));
        }

        let client_email = config
            .client_email
            .clone()
            .ok_or_else(|| StoreError::Config("GOOGLE_CLIENT_EMAIL is not set".to_string()))?;
        let private_key = config
            .private_key
            .as_deref()
            .ok_or_else(|| StoreError::Config("GOOGLE_PRIVATE_KEY is not set".to_string()))?;
        let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
            .map_err(|e| StoreError::Config(format!("invalid service account key: {}", e)))?;

        Ok(Self::ServiceAccount {
            client_email,
            key,
            token_url: config.token_url.clone(),
            cached: Mutex::new(None),
        })
    }

    pub async fn token(&self, http: &reqwest::Client) -> Result<String, StoreError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ServiceAccount {
                client_email,
                key,
                token_url,
                cached,
            } => {
                let mut cached = cached.lock().await;
                let now = Utc::now();

                if let Some(entry) = cached.as_ref() {
                    if entry.expires_at - Duration::seconds(60) > now {
                        return Ok(entry.token.clone());
                    }
                }

                let claims = AssertionClaims::new(client_email, token_url, now);
                let assertion = encode(&Header::new(Algorithm::RS256), &claims, key)
                    .map_err(|e| StoreError::Auth(format!("cannot sign assertion: {}", e)))?;

                let response = http
                    .post(token_url.as_str())
                    .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(StoreError::Auth(format!("token endpoint returned {}: {}", status, body)));
                }

                let issued: TokenResponse = response.json().await?;
                debug!("Obtained store access token for {} ({}s)", client_email, issued.expires_in);

                *cached = Some(CachedToken {
                    token: issued.access_token.clone(),
                    expires_at: now + Duration::seconds(issued.expires_in),
                });
                Ok(issued.access_token)
            }
        }
    }
}
