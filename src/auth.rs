//! Storage endpoint and token acquisition against the store's auth endpoint.
//!
//! The [`Authenticator`] owns the cached [`Credential`] and is the only thing
//! that mutates it. Callers get a clone per request; the cache is replaced as a
//! whole on refresh, so a credential is either fully populated or absent, never
//! half-set. The cache sits behind a `tokio::sync::Mutex`, which also gives
//! at-most-one refresh in flight: concurrent callers queue on the lock while
//! the first one re-authenticates.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::AuthConfig;
use crate::error::AuthError;

const STORAGE_USER_HEADER: &str = "X-Storage-User";
const STORAGE_PASS_HEADER: &str = "X-Storage-Pass";
const STORAGE_URL_HEADER: &str = "X-Storage-Url";
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const TOKEN_EXPIRES_HEADER: &str = "X-Auth-Token-Expires";

/// A storage endpoint plus the token authorising requests against it.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Base URL all object operations are issued against.
    pub storage_url: String,
    /// Value for the `X-Auth-Token` request header.
    pub token: String,
    expires_at: Option<Instant>,
}

impl Credential {
    fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(at) => now >= at,
            None => false,
        }
    }
}

/// How token lifetimes reported by the auth endpoint are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Honour `X-Auth-Token-Expires`; a missing header means the token never
    /// expires.
    #[default]
    RespectHeader,
    /// Cache the first token for the lifetime of the process.
    CacheForever,
}

/// Obtains and caches credentials from the configured auth endpoint.
pub struct Authenticator {
    http: reqwest::Client,
    config: AuthConfig,
    cached: Mutex<Option<Credential>>,
}

impl Authenticator {
    pub fn new(http: reqwest::Client, config: AuthConfig) -> Self {
        Self {
            http,
            config,
            cached: Mutex::new(None),
        }
    }

    /// Returns the current credential, refreshing it first when the cache is
    /// empty or past its expiry instant. Safe to call before every request.
    pub async fn credential(&self) -> Result<Credential, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref() {
            if !credential.is_expired(Instant::now()) {
                return Ok(credential.clone());
            }
            debug!("cached credential expired, re-authenticating");
        }
        let fresh = self.request_credential().await?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drops the cached credential so the next [`credential`](Self::credential)
    /// call re-authenticates. Used when the store rejects a token mid-flight.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    async fn request_credential(&self) -> Result<Credential, AuthError> {
        let response = self
            .http
            .get(&self.config.auth_url)
            .header(STORAGE_USER_HEADER, &self.config.user)
            .header(STORAGE_PASS_HEADER, &self.config.password)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Status(status.as_u16()));
        }

        let storage_url = required_header(&response, STORAGE_URL_HEADER)?;
        let token = required_header(&response, AUTH_TOKEN_HEADER)?;
        let expires_at = match self.config.expiry {
            ExpiryPolicy::CacheForever => None,
            ExpiryPolicy::RespectHeader => token_lifetime(&response)?
                .map(|lifetime| Instant::now() + lifetime),
        };

        info!(storage_url = %storage_url, "obtained storage credential");
        Ok(Credential {
            storage_url: storage_url.trim_end_matches('/').to_string(),
            token,
            expires_at,
        })
    }
}

fn required_header(
    response: &reqwest::Response,
    name: &'static str,
) -> Result<String, AuthError> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or(AuthError::MissingHeader(name))
}

fn token_lifetime(response: &reqwest::Response) -> Result<Option<Duration>, AuthError> {
    let Some(raw) = response.headers().get(TOKEN_EXPIRES_HEADER) else {
        return Ok(None);
    };
    let raw = raw
        .to_str()
        .map_err(|_| AuthError::InvalidLifetime(format!("{raw:?}")))?;
    let seconds: u64 = raw
        .parse()
        .map_err(|_| AuthError::InvalidLifetime(raw.to_string()))?;
    Ok(Some(Duration::from_secs(seconds)))
}
