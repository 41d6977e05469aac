//! Store contract shared by every backend.
//!
//! A store keeps two structures in step: forward entries keyed by cache key,
//! and tag buckets listing the keys labelled with each tag. After any
//! operation completes, every tag of a live entry lists that entry's key, and
//! every key listed in a bucket is live and carries that tag.

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use std::{collections::HashSet, sync::Arc};

use crate::{CacheEntry, StoreError, Ttl};

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store a response under `key`, replacing any previous entry and its tag
    /// associations. Returns the body fingerprint. A non-positive TTL writes
    /// nothing.
    async fn set(
        &self,
        key: &str,
        status: StatusCode,
        headers: &[(String, String)],
        body: &[Bytes],
        ttl: Ttl,
        tags: &[String],
    ) -> Result<String, StoreError>;

    /// Fetch a live entry. An expired entry is purged (with its tag
    /// associations) by the read that finds it.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError>;

    /// Remove the entry under `key` and its tag associations, returning the
    /// tags it carried. Empty when nothing was stored.
    async fn invalidate_key(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Remove every entry labelled with any of `tags`, including from the
    /// buckets of tags not named in the call.
    async fn invalidate_tag(&self, tags: &[String]) -> Result<(), StoreError>;

    /// Keys currently listed under `tag`.
    async fn get_keys_by_tag(&self, tag: &str) -> Result<HashSet<String>, StoreError>;

    /// Check if a live entry exists for `key`
    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Etag function used by `set`.
    fn fingerprint(&self, body: &[Bytes]) -> String {
        crate::fingerprint(body)
    }
}

pub type AbstractCacheStore = Arc<dyn CacheStore + Send + Sync>;
