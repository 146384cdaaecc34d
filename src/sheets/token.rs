//! OAuth2 credential provider for the spreadsheet sink
//!
//! The publisher only needs "a currently valid bearer token". This module
//! hides the cached-refresh machinery behind the [`TokenProvider`] trait:
//! an on-disk JSON cache (access token, refresh token, expiry) is restored
//! across process restarts, served while fresh, and refreshed against the
//! OAuth2 token endpoint with a `refresh_token` grant when it is about to
//! expire. The first-time interactive consent flow is out of scope - the
//! cache file with a valid refresh token is provisioned by the operator.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::SheetConfig;

/// Refresh this long before the recorded expiry to absorb clock skew.
const EXPIRY_SKEW_SECS: i64 = 60;

/// A failure obtaining a usable credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read token cache {path:?}: {source}")]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("token cache {path:?} is malformed: {source}")]
    CacheParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("token refresh request failed: {0}")]
    Refresh(#[from] reqwest::Error),

    #[error("token endpoint rejected the refresh: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Yields a currently valid bearer token for the sink.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, CredentialError>;
}

/// Persisted token state, restored across process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenCache {
    access_token: String,
    refresh_token: String,
    expiry: DateTime<Utc>,
}

impl TokenCache {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expiry - now > TimeDelta::seconds(EXPIRY_SKEW_SECS)
    }
}

/// Token endpoint response for a `refresh_token` grant.
#[derive(Debug, Deserialize)]
struct RefreshGrant {
    access_token: String,
    expires_in: i64,
    /// Some providers rotate the refresh token on every grant.
    refresh_token: Option<String>,
}

/// Disk-cached OAuth2 provider using the `refresh_token` grant.
pub struct OauthTokenProvider {
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    cache_path: PathBuf,
    http: reqwest::Client,
    cache: Mutex<Option<TokenCache>>,
}

impl OauthTokenProvider {
    pub fn new(config: &SheetConfig) -> Self {
        Self {
            token_endpoint: config.token_endpoint.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            cache_path: config.token_cache.clone(),
            http: reqwest::Client::new(),
            cache: Mutex::new(None),
        }
    }

    fn load_cache(&self) -> Result<TokenCache, CredentialError> {
        let contents =
            std::fs::read_to_string(&self.cache_path).map_err(|source| {
                CredentialError::CacheRead {
                    path: self.cache_path.clone(),
                    source,
                }
            })?;
        serde_json::from_str(&contents).map_err(|source| CredentialError::CacheParse {
            path: self.cache_path.clone(),
            source,
        })
    }

    /// Best effort: a failed write only costs a re-refresh after restart.
    fn persist_cache(&self, cache: &TokenCache) {
        let serialized = match serde_json::to_string_pretty(cache) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("Could not serialize token cache: {}", err);
                return;
            }
        };
        if let Err(err) = std::fs::write(&self.cache_path, serialized) {
            warn!(
                "Could not persist token cache to {:?}: {}",
                self.cache_path, err
            );
        }
    }

    async fn refresh(&self, stale: TokenCache) -> Result<TokenCache, CredentialError> {
        debug!("Access token expired, requesting refresh");
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", stale.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let grant: RefreshGrant = response.json().await?;
        Ok(TokenCache {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.unwrap_or(stale.refresh_token),
            expiry: Utc::now() + TimeDelta::seconds(grant.expires_in),
        })
    }
}

#[async_trait]
impl TokenProvider for OauthTokenProvider {
    async fn access_token(&self) -> Result<String, CredentialError> {
        let mut guard = self.cache.lock().await;

        let current = match guard.take() {
            Some(cache) => cache,
            None => self.load_cache()?,
        };

        if current.is_fresh(Utc::now()) {
            let token = current.access_token.clone();
            *guard = Some(current);
            return Ok(token);
        }

        let refreshed = self.refresh(current).await?;
        self.persist_cache(&refreshed);
        let token = refreshed.access_token.clone();
        *guard = Some(refreshed);
        Ok(token)
    }
}

/// Fixed token, for tests and deployments that manage credentials
/// externally (environment, secret manager).
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, CredentialError> {
        Ok(self.token.clone())
    }
}
