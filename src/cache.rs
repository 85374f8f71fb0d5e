use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::DecodingKey;
use reqwest::{header, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::error::KeysError;
use crate::key;

/// Google's X.509 certificate metadata endpoint for Firebase token signing
/// keys.
pub const DEFAULT_KEY_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

/// Non-200 responses are retried immediately this many times before a refresh
/// fails.
const DEFAULT_RETRY_LIMIT: u32 = 5;

/// Advisory margin for [`KeyCache::expires_soon`].
const EXPIRY_MARGIN: Duration = Duration::from_secs(600);

struct CacheState {
    keys: HashMap<String, DecodingKey>,
    expires_at: SystemTime,
}

/// A cache of the provider's public signing keys, indexed by key identifier.
///
/// The cache is fresh until the instant given by the `Expires` header of the
/// last successful fetch. [`KeyCache::get`] refreshes synchronously when the
/// cache has gone stale, so callers must treat it as a potentially blocking,
/// network-performing call. Concurrent refreshes are serialized; a refresh
/// replaces the whole key set in one swap, so readers never observe a
/// partially updated mapping and rotated-out keys stop being honoured.
pub struct KeyCache {
    url: Url,
    client: reqwest::Client,
    state: RwLock<CacheState>,
    refresh_gate: Mutex<()>,
}

// DecodingKey is not Debug, so the key material is elided.
impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap();
        f.debug_struct("KeyCache")
            .field("url", &self.url.as_str())
            .field("keys", &state.keys.len())
            .field("expires_at", &state.expires_at)
            .finish_non_exhaustive()
    }
}

impl KeyCache {
    /// Creates a cache against [`DEFAULT_KEY_URL`] and performs the initial
    /// fetch. Fails if that fetch fails.
    pub async fn new() -> Result<KeyCache, KeysError> {
        let url = Url::parse(DEFAULT_KEY_URL).expect("default key URL is valid");
        KeyCache::with_url(url).await
    }

    /// Creates a cache against a custom key distribution endpoint and
    /// performs the initial fetch. Fails if that fetch fails.
    pub async fn with_url(url: Url) -> Result<KeyCache, KeysError> {
        let cache = KeyCache {
            url,
            client: reqwest::Client::new(),
            state: RwLock::new(CacheState {
                keys: HashMap::new(),
                expires_at: UNIX_EPOCH,
            }),
            refresh_gate: Mutex::new(()),
        };
        cache.refresh().await?;
        Ok(cache)
    }

    /// Looks up the public key for `kid`, refreshing first when the cache is
    /// stale.
    ///
    /// `None` is a normal outcome, not an error: the provider may have
    /// rotated the key out, or the token may carry a forged `kid`.
    pub async fn get(&self, kid: &str) -> Result<Option<DecodingKey>, KeysError> {
        if self.expired() {
            self.refresh().await?;
        }
        let state = self.state.read().unwrap();
        Ok(state.keys.get(kid).cloned())
    }

    /// Fetches the latest key set and replaces the cached one atomically.
    pub async fn refresh(&self) -> Result<(), KeysError> {
        let _gate = self.refresh_gate.lock().await;

        let (expires_at, keys) = self.fetch_keys(DEFAULT_RETRY_LIMIT).await?;
        debug!(keys = keys.len(), "replacing cached key set");

        let mut state = self.state.write().unwrap();
        state.keys = keys;
        state.expires_at = expires_at;
        Ok(())
    }

    /// Forces the cache to be considered stale, so the next [`KeyCache::get`]
    /// triggers a refresh regardless of wall-clock time.
    pub fn expire(&self) {
        self.state.write().unwrap().expires_at = UNIX_EPOCH;
    }

    /// Whether the cache has passed its server-supplied expiry instant.
    pub fn expired(&self) -> bool {
        SystemTime::now() >= self.expires_at()
    }

    /// Whether the cache expires within the next ten minutes. Advisory only;
    /// [`KeyCache::get`] does not use it.
    pub fn expires_soon(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN >= self.expires_at()
    }

    /// The instant until which the cache is considered fresh.
    pub fn expires_at(&self) -> SystemTime {
        self.state.read().unwrap().expires_at
    }

    async fn fetch_keys(
        &self,
        retry_limit: u32,
    ) -> Result<(SystemTime, HashMap<String, DecodingKey>), KeysError> {
        let mut retries_left = retry_limit;
        let response = loop {
            let response = self
                .client
                .get(self.url.clone())
                .send()
                .await
                .map_err(KeysError::Fetch)?;

            let status = response.status();
            if status == StatusCode::OK {
                break response;
            }
            if retries_left == 0 {
                return Err(KeysError::ServerStatus(status));
            }
            retries_left -= 1;
            warn!(%status, retries_left, "key server returned an error status, retrying");
        };

        let expires = response
            .headers()
            .get(header::EXPIRES)
            .ok_or(KeysError::MissingExpiresHeader)?
            .to_str()
            .map_err(|_| KeysError::InvalidExpiresHeader)?;
        let expires_at = parse_http_date(expires)?;

        let body: HashMap<String, String> =
            response.json().await.map_err(KeysError::Body)?;

        let mut keys = HashMap::with_capacity(body.len());
        for (kid, pem) in body {
            let decoding_key = key::decoding_key_from_pem(&pem)
                .map_err(|source| KeysError::KeyParse {
                    kid: kid.clone(),
                    source,
                })?;
            keys.insert(kid, decoding_key);
        }

        Ok((expires_at, keys))
    }
}

fn parse_http_date(value: &str) -> Result<SystemTime, KeysError> {
    chrono::DateTime::parse_from_rfc2822(value)
        .map(SystemTime::from)
        .map_err(|_| KeysError::InvalidExpiresHeader)
}
