//! Signing keys published by the identity provider as a JWK set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;

/// Minimum time between two fetches, so unknown `kid`s cannot force a
/// download on every request.
const REFRESH_COOLDOWN: Duration = Duration::from_secs(30);
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum JwksError {
    #[error("Failed to fetch JWK set: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("No signing key matches kid {0:?}")]
    UnknownKey(Option<String>),
}

#[derive(Default)]
struct Cached {
    keys: Option<Arc<JwkSet>>,
    fetched_at: Option<Instant>,
}

/// Lazily downloaded, cached JWK set. Refetched when a token names a key
/// the cached set does not have.
pub struct RemoteKeySet {
    url: Url,
    http: reqwest::Client,
    cached: Mutex<Cached>,
}

impl RemoteKeySet {
    pub fn new(url: Url) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            url,
            http,
            cached: Mutex::new(Cached::default()),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The key named by `kid`. Without a `kid` the set must hold exactly one key.
    pub async fn key_for(&self, kid: Option<&str>) -> Result<Jwk, JwksError> {
        let mut cached = self.cached.lock().await;

        if let Some(jwk) = cached.keys.as_deref().and_then(|set| select(set, kid)) {
            return Ok(jwk.clone());
        }

        let cooling_down = cached
            .fetched_at
            .map_or(false, |at| at.elapsed() < REFRESH_COOLDOWN);
        if cached.keys.is_some() && cooling_down {
            return Err(JwksError::UnknownKey(kid.map(str::to_string)));
        }

        let keys = Arc::new(self.fetch().await?);
        cached.keys = Some(keys.clone());
        cached.fetched_at = Some(Instant::now());

        select(&keys, kid)
            .cloned()
            .ok_or_else(|| JwksError::UnknownKey(kid.map(str::to_string)))
    }

    async fn fetch(&self) -> Result<JwkSet, JwksError> {
        tracing::debug!(url = %self.url, "fetching jwk set");
        let keys = self
            .http
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;
        Ok(keys)
    }
}

fn select<'s>(set: &'s JwkSet, kid: Option<&str>) -> Option<&'s Jwk> {
    match kid {
        Some(kid) => set.find(kid),
        None if set.keys.len() == 1 => set.keys.first(),
        None => None,
    }
}
