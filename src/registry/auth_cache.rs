//! The TTL-bucketed, single-flight cache wrapped around every [`super::auth::Authenticator`].
//!
//! A cache key is `(floor(now/ttl), image, action)`: all requests landing in the same
//! `ttl`-second bucket for the same `(image, action)` pair share one
//! `Authenticator::headers` call. Concurrent lookups for the same key race to insert the
//! same `OnceCell` and then race to initialize it, so only the winner actually calls the
//! underlying authenticator; every other caller awaits the same in-flight future.

use super::auth::Authenticator;
use crate::error::Result;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, OnceCell};

type CacheKey = (u64, String, String);

pub struct AuthCache {
    authenticator: Option<Arc<dyn Authenticator>>,
    ttl: u64,
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<HeaderMap>>>>,
}

impl AuthCache {
    pub fn new(authenticator: Option<Arc<dyn Authenticator>>, ttl: u64) -> Self {
        AuthCache {
            authenticator,
            ttl: ttl.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn bucket(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs();
        now / self.ttl
    }

    /// Returns the headers to attach to a request against `image` performing `action`,
    /// invoking the underlying authenticator at most once per `(bucket, image, action)`.
    /// Returns an empty header map when no authenticator is configured.
    pub async fn headers(&self, image: &str, action: &str) -> Result<HeaderMap> {
        let Some(authenticator) = &self.authenticator else {
            return Ok(HeaderMap::new());
        };

        let key: CacheKey = (self.bucket(), image.to_string(), action.to_string());
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(key).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };

        let headers = cell
            .get_or_try_init(|| async { authenticator.headers(image, action).await })
            .await?;
        Ok(headers.clone())
    }
}
