//! The accelerator: consults the store by cache key, replays or answers
//! `304` on a hit, and on a miss runs the handler and stores what the
//! policy allows.
#![deny(clippy::unwrap_used)]
#![allow(clippy::collapsible_if)]
use accelerator_config::{AcceleratorSettings, BackendSettings, DEFAULT_DENY_HEADERS};
use accelerator_store::{AbstractCacheStore, CacheEntry, InMemoryCacheStore, StoreError};
use bytes::Bytes;
use derive_builder::Builder;
use http::Method;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::AcceleratorError;
use crate::handler::Handler;
use crate::policy::CachePolicy;
use crate::request::{AcceleratedResponse, CacheHints, CacheOutcome, CacheRequest};
use crate::stats::{CacheStats, CacheStatsSnapshot};

/// Response header carrying the body fingerprint of a stored response.
pub const ETAG_HEADER: &str = "ETag";

#[derive(Builder, Clone, Debug, PartialEq, Eq)]
#[builder(public, setter(into))]
pub struct AcceleratorOptions {
    #[builder(default = "DEFAULT_DENY_HEADERS.iter().map(|h| h.to_string()).collect()")]
    pub deny_headers: Vec<String>,
    /// Serve a miss instead of failing when the store errors
    #[builder(default = "false")]
    pub store_errors_as_miss: bool,
}

impl Default for AcceleratorOptions {
    fn default() -> Self {
        Self {
            deny_headers: DEFAULT_DENY_HEADERS.iter().map(|h| h.to_string()).collect(),
            store_errors_as_miss: false,
        }
    }
}

impl From<&AcceleratorSettings> for AcceleratorOptions {
    fn from(settings: &AcceleratorSettings) -> Self {
        Self {
            deny_headers: settings.deny_headers.clone(),
            store_errors_as_miss: settings.store_errors_as_miss,
        }
    }
}

pub struct Accelerator<H> {
    store: AbstractCacheStore,
    handler: Arc<H>,
    policy: CachePolicy,
    options: AcceleratorOptions,
    stats: Arc<CacheStats>,
}

impl<H> Clone for Accelerator<H> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            handler: self.handler.clone(),
            policy: self.policy.clone(),
            options: self.options.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<H> std::fmt::Debug for Accelerator<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accelerator")
            .field("options", &self.options)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

impl<H> Accelerator<H>
where
    H: Handler,
{
    pub fn new(store: AbstractCacheStore, handler: H) -> Self {
        Self::with_options(store, handler, AcceleratorOptions::default())
    }

    pub fn with_options(
        store: AbstractCacheStore,
        handler: H,
        options: AcceleratorOptions,
    ) -> Self {
        info!(
            deny_headers = ?options.deny_headers,
            store_errors_as_miss = options.store_errors_as_miss,
            "accelerator created"
        );
        Self {
            store,
            handler: Arc::new(handler),
            policy: CachePolicy::new(options.deny_headers.clone()),
            options,
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Build the store described by `settings` and wrap `handler` with it.
    pub async fn from_settings(
        settings: &AcceleratorSettings,
        handler: H,
    ) -> Result<Self, StoreError> {
        let store = store_from_settings(settings).await?;
        Ok(Self::with_options(store, handler, settings.into()))
    }

    pub fn store(&self) -> &AbstractCacheStore {
        &self.store
    }

    pub fn options(&self) -> &AcceleratorOptions {
        &self.options
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    #[instrument(skip_all, fields(method = %req.method, path = %req.path))]
    pub async fn handle(
        &self,
        req: &CacheRequest,
    ) -> Result<AcceleratedResponse, AcceleratorError<H::Error>> {
        let key = req.cache_key();

        // Only GET reads the store; other methods always reach the handler
        if req.method == Method::GET {
            if let Some(entry) = self.lookup(&key).await? {
                if req.matches_etag(&entry.etag) {
                    debug!(cache = "accelerator", outcome = "not_modified", "validator matches etag");
                    self.stats.record_outcome(CacheOutcome::NotModified);
                    return Ok(AcceleratedResponse::not_modified());
                }
                debug!(cache = "accelerator", outcome = "hit", "serving cached response");
                self.stats.record_outcome(CacheOutcome::Hit);
                return Ok(AcceleratedResponse::from_entry(entry));
            }
        }

        debug!(cache = "accelerator", outcome = "miss", "cache miss, executing handler");

        let mut hints = CacheHints::default();
        let mut response = self
            .handler
            .handle(req, &mut hints)
            .await
            .map_err(AcceleratorError::Handler)?;

        let ttl = match self.policy.check(
            &req.method,
            response.status,
            &response.headers,
            &hints,
        ) {
            Ok(ttl) => ttl,
            Err(reason) => {
                debug!(cache = "accelerator", reason = ?reason, "response not cacheable");
                self.stats.record_outcome(CacheOutcome::Miss);
                return Ok(AcceleratedResponse::fresh(response, CacheOutcome::Miss));
            }
        };

        let stored = self
            .store
            .set(
                &key,
                response.status,
                &response.headers,
                &response.body,
                ttl,
                &hints.tags,
            )
            .await;

        match stored {
            Ok(etag) => {
                debug!(
                    cache = "accelerator",
                    etag = %etag,
                    ttl = ?ttl,
                    tags_count = hints.tags.len(),
                    "caching response"
                );
                // ETag goes on the outgoing response only, never into the entry
                response.headers.push((ETAG_HEADER.to_string(), etag));
                self.stats.record_outcome(CacheOutcome::Stored);
                Ok(AcceleratedResponse::fresh(response, CacheOutcome::Stored))
            }
            Err(e) => {
                self.stats.record_store_error();
                if !self.options.store_errors_as_miss {
                    return Err(e.into());
                }
                warn!(error = %e, "store write failed, response not cached");
                self.stats.record_outcome(CacheOutcome::Miss);
                Ok(AcceleratedResponse::fresh(response, CacheOutcome::Miss))
            }
        }
    }

    /// Run [`handle`](Self::handle) for a request described by HTTP parts.
    pub async fn handle_http(
        &self,
        parts: &http::request::Parts,
    ) -> Result<http::Response<Bytes>, AcceleratorError<H::Error>> {
        let req = CacheRequest::from_parts(parts);
        Ok(self.handle(&req).await?.into_http())
    }

    /// Drop every entry labelled with any of `tags`.
    pub async fn invalidate_tag(&self, tags: &[String]) -> Result<(), StoreError> {
        self.store.invalidate_tag(tags).await?;
        debug!(cache = "accelerator", tags = ?tags, "invalidated tags");
        self.stats.record_invalidation();
        Ok(())
    }

    /// Drop the entry under `key`, returning the tags it carried.
    pub async fn invalidate_key(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let tags = self.store.invalidate_key(key).await?;
        debug!(cache = "accelerator", key = key, "invalidated key");
        self.stats.record_invalidation();
        Ok(tags)
    }

    async fn lookup(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        match self.store.get(key).await {
            Ok(entry) => Ok(entry),
            Err(e) => {
                self.stats.record_store_error();
                if !self.options.store_errors_as_miss {
                    return Err(e);
                }
                warn!(error = %e, "store read failed, treating as miss");
                Ok(None)
            }
        }
    }
}

/// Create the store named by the `backend` section of the settings.
pub async fn store_from_settings(
    settings: &AcceleratorSettings,
) -> Result<AbstractCacheStore, StoreError> {
    match &settings.backend {
        BackendSettings::Memory => {
            info!("using in-memory cache store");
            Ok(Arc::new(InMemoryCacheStore::new()))
        }
        #[cfg(feature = "redis")]
        BackendSettings::Redis { uri } => {
            let client = rustis::client::Client::connect(uri.as_str()).await?;
            let store: accelerator_store::RedisCacheStore =
                accelerator_store::RedisCacheStore::new(client, &settings.key_prefix).await?;
            info!(key_prefix = %settings.key_prefix, "using redis cache store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        BackendSettings::Redis { .. } => Err(StoreError::Backend(
            "redis backend requires the `redis` feature".to_string(),
        )),
    }
}
