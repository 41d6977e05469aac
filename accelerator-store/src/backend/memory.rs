//! In-memory implementation of the `CacheStore` trait. Entries and the tag
//! index live in process memory behind a single lock, so every logical
//! operation sees and leaves both structures consistent.
use crate::entry::normalize_tags;
use crate::{
    CacheEntry, CacheStore, Clock, Expiry, StoreError, SystemClock, Ttl, fingerprint,
};
use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    tags_lookup: HashMap<String, HashSet<String>>,
}

impl CacheState {
    fn add_tag(&mut self, key: &str, tags: &[String]) {
        for tag in tags {
            self.tags_lookup
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
    }

    fn remove_tag<'a>(&mut self, key: &str, tags: impl IntoIterator<Item = &'a String>) {
        for tag in tags {
            if let Some(keys) = self.tags_lookup.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tags_lookup.remove(tag);
                }
            }
        }
    }

    /// Drop the forward entry only, handing back the tags it carried.
    fn remove_entry(&mut self, key: &str) -> Vec<String> {
        self.entries
            .remove(key)
            .map(|entry| entry.tags)
            .unwrap_or_default()
    }
}

pub struct InMemoryCacheStore {
    state: Mutex<CacheState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheState>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Number of entries held, expired ones included until a read purges them.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Number of non-empty tag buckets.
    pub fn tag_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.tags_lookup.len())
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn set(
        &self,
        key: &str,
        status: StatusCode,
        headers: &[(String, String)],
        body: &[Bytes],
        ttl: Ttl,
        tags: &[String],
    ) -> Result<String, StoreError> {
        let etag = fingerprint(body);
        let Some(expire_at) = Expiry::from_ttl(ttl, self.clock.now()) else {
            debug!(key, ?ttl, "ttl not positive, nothing stored");
            return Ok(etag);
        };

        let tags = normalize_tags(tags);
        let entry = CacheEntry {
            status,
            headers: headers.to_vec(),
            body: body.to_vec(),
            expire_at,
            etag: etag.clone(),
            tags: tags.clone(),
        };

        let mut state = self.lock()?;
        let previous_tags = state.remove_entry(key);
        state.remove_tag(key, &previous_tags);
        state.add_tag(key, &tags);
        state.entries.insert(key.to_string(), entry);

        debug!(key, etag = %etag, tags = tags.len(), "stored cache entry");
        Ok(etag)
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let now = self.clock.now();
        let mut state = self.lock()?;

        match state.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.clone())),
            Some(_) => {}
        }

        let dirty_tags = state.remove_entry(key);
        state.remove_tag(key, &dirty_tags);
        debug!(key, "purged expired cache entry");
        Ok(None)
    }

    async fn invalidate_key(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut state = self.lock()?;
        let dirty_tags = state.remove_entry(key);
        state.remove_tag(key, &dirty_tags);
        Ok(dirty_tags)
    }

    async fn invalidate_tag(&self, tags: &[String]) -> Result<(), StoreError> {
        let mut state = self.lock()?;

        // Snapshot the affected keys before touching any bucket
        let affected: HashSet<String> = tags
            .iter()
            .filter_map(|tag| state.tags_lookup.get(tag))
            .flatten()
            .cloned()
            .collect();

        let mut keys_with_dirty_tags: HashMap<String, HashSet<String>> = HashMap::new();
        for key in affected {
            let dirty_tags = state.remove_entry(&key);
            let bucket = keys_with_dirty_tags.entry(key).or_default();
            bucket.extend(dirty_tags);
            bucket.extend(tags.iter().cloned());
        }

        let invalidated = keys_with_dirty_tags.len();
        for (key, dirty_tags) in keys_with_dirty_tags {
            state.remove_tag(&key, &dirty_tags);
        }

        debug!(?tags, invalidated, "invalidated tags");
        Ok(())
    }

    async fn get_keys_by_tag(&self, tag: &str) -> Result<HashSet<String>, StoreError> {
        Ok(self
            .lock()?
            .tags_lookup
            .get(tag)
            .cloned()
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for InMemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("InMemoryCacheStore");
        match self.state.lock() {
            Ok(state) => debug
                .field("entries", &state.entries.len())
                .field("tags", &state.tags_lookup.len()),
            Err(_) => debug.field("state", &"<poisoned>"),
        };
        debug.field("clock", &self.clock).finish()
    }
}
