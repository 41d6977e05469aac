//! `RedisCacheStore` keeps cache entries in a shared Redis instance so that
//! several processes can serve and invalidate the same responses.
//!
//! Layout:
//! - `{prefix}{key}` is a hash holding one entry with the fields `status`,
//!   `headers` (serialized), `body` (raw bytes), `expire_at` (unix seconds,
//!   `-1` for never), `etag` and `tags` (serialized).
//! - `{prefix}tag.{tag}` is a set of cache keys labelled with `tag`.
//!
//! Every write that touches both an entry and tag sets runs inside one
//! MULTI/EXEC transaction. The entry hash is WATCHed before its stored tags
//! are read, so a concurrent write to the same key aborts the transaction;
//! the write is then retried from a fresh read, up to
//! `MAX_WRITE_ATTEMPTS` times, before failing with `StoreError::Backend`.
//! WATCH state is per connection, so give each store its own client rather
//! than sharing one with unrelated transactional code.
//!
//! Tag invalidation snapshots the requested sets first and then removes
//! entries one by one; a key added to a bucket while that bucket is being
//! invalidated may survive the call.

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use rustis::client::{BatchPreparedCommand, Client, Transaction};
use rustis::commands::{GenericCommands, HashCommands, SetCommands, TransactionCommands};
use rustis::resp::BulkString;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::entry::normalize_tags;
use crate::serializers::{JsonSerializer, RecordSerializer};
use crate::{
    CacheEntry, CacheStore, Clock, Expiry, StoreError, SystemClock, Ttl, fingerprint,
};

pub const DEFAULT_KEY_PREFIX: &str = "acc.";

/// Attempts at a watched write before giving up on a contended key.
pub const MAX_WRITE_ATTEMPTS: usize = 8;

const FIELD_STATUS: &str = "status";
const FIELD_HEADERS: &str = "headers";
const FIELD_BODY: &str = "body";
const FIELD_EXPIRE_AT: &str = "expire_at";
const FIELD_ETAG: &str = "etag";
const FIELD_TAGS: &str = "tags";

type Record = HashMap<String, BulkString>;

pub struct RedisCacheStore<S = JsonSerializer>
where
    S: RecordSerializer,
{
    pub client: Client,
    pub key_prefix: String,
    clock: Arc<dyn Clock>,
    _marker: PhantomData<S>,
}

impl<S> RedisCacheStore<S>
where
    S: RecordSerializer,
{
    pub async fn new(client: Client, key_prefix: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client,
            key_prefix: key_prefix.to_string(),
            clock: Arc::new(SystemClock),
            _marker: PhantomData,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn get_entry_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    pub fn get_tag_key(&self, tag: &str) -> String {
        format!("{}tag.{}", self.key_prefix, tag)
    }

    /// Run a transaction queued after a WATCH. `Ok(false)` means a watched
    /// key changed and nothing was applied.
    async fn try_execute(&self, transaction: Transaction) -> Result<bool, StoreError> {
        match transaction.execute::<()>().await {
            Ok(()) => Ok(true),
            Err(rustis::Error::Aborted) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn watch_entry(&self, key: &str) -> Result<(), StoreError> {
        self.client.watch([self.get_entry_key(key)]).await?;
        Ok(())
    }

    fn contended(key: &str) -> StoreError {
        StoreError::Backend(format!(
            "`{key}` kept changing, gave up after {MAX_WRITE_ATTEMPTS} attempts"
        ))
    }

    async fn fetch_record(&self, key: &str) -> Result<Record, StoreError> {
        let record: Record = self.client.hgetall(self.get_entry_key(key)).await?;
        Ok(record)
    }

    /// Tags recorded for `key`. A missing entry or an unreadable tag field
    /// yields no tags.
    async fn stored_tags(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let record = self.fetch_record(key).await?;
        if record.is_empty() {
            return Ok(Vec::new());
        }
        match text_field(&record, FIELD_TAGS).and_then(S::deserialize_tags) {
            Ok(tags) => Ok(tags),
            Err(e) => {
                warn!(key, error = %e, "unreadable tags on cache record");
                Ok(Vec::new())
            }
        }
    }

    /// Delete the entry and drop `key` from its stored tag sets and from
    /// `extra_tags`, returning the stored tags. The stored tags are read under
    /// WATCH, so a write landing in between forces a fresh attempt.
    async fn remove_entry(
        &self,
        key: &str,
        extra_tags: &[String],
    ) -> Result<Vec<String>, StoreError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            self.watch_entry(key).await?;
            let stored = self.stored_tags(key).await?;
            let mut dirty_tags = stored.clone();
            dirty_tags.extend(extra_tags.iter().cloned());

            let mut transaction = self.client.create_transaction();
            transaction.del([self.get_entry_key(key)]).forget();
            for tag in normalize_tags(&dirty_tags) {
                transaction.srem(self.get_tag_key(&tag), [key]).forget();
            }
            if self.try_execute(transaction).await? {
                return Ok(stored);
            }
            debug!(key, attempt, "entry changed during removal, retrying");
        }
        Err(Self::contended(key))
    }

    fn decode_record(record: &Record) -> Result<CacheEntry, StoreError> {
        let status = text_field(record, FIELD_STATUS)?
            .parse::<u16>()
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| StoreError::Deserialization("invalid status".to_string()))?;
        let expire_at = text_field(record, FIELD_EXPIRE_AT)?
            .parse::<i64>()
            .ok()
            .and_then(Expiry::from_timestamp)
            .ok_or_else(|| StoreError::Deserialization("invalid expire_at".to_string()))?;
        let headers = S::deserialize_headers(text_field(record, FIELD_HEADERS)?)?;
        let tags = S::deserialize_tags(text_field(record, FIELD_TAGS)?)?;
        let etag = text_field(record, FIELD_ETAG)?.to_string();

        let raw_body = field(record, FIELD_BODY)?;
        let body = if raw_body.is_empty() {
            Vec::new()
        } else {
            vec![Bytes::copy_from_slice(raw_body)]
        };

        Ok(CacheEntry {
            status,
            headers,
            body,
            expire_at,
            etag,
            tags,
        })
    }
}

fn field<'a>(record: &'a Record, name: &str) -> Result<&'a [u8], StoreError> {
    record
        .get(name)
        .map(|value| value.as_bytes())
        .ok_or_else(|| StoreError::Deserialization(format!("missing field `{name}`")))
}

fn text_field<'a>(record: &'a Record, name: &str) -> Result<&'a str, StoreError> {
    std::str::from_utf8(field(record, name)?)
        .map_err(|e| StoreError::Deserialization(format!("field `{name}`: {e}")))
}

fn bulk(text: impl Into<String>) -> BulkString {
    BulkString::from(text.into().into_bytes())
}

#[async_trait]
impl<S> CacheStore for RedisCacheStore<S>
where
    S: RecordSerializer,
{
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
        let record = [
            (FIELD_STATUS, bulk(status.as_u16().to_string())),
            (FIELD_HEADERS, bulk(S::serialize_headers(headers)?)),
            (FIELD_BODY, BulkString::from(body.concat())),
            (FIELD_EXPIRE_AT, bulk(expire_at.to_timestamp().to_string())),
            (FIELD_ETAG, bulk(etag.clone())),
            (FIELD_TAGS, bulk(S::serialize_tags(&tags)?)),
        ];
        let entry_key = self.get_entry_key(key);

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            self.watch_entry(key).await?;
            let previous_tags = self.stored_tags(key).await?;

            let mut transaction = self.client.create_transaction();
            transaction.del([&entry_key]).forget();
            transaction.hset(&entry_key, record.clone()).forget();
            for tag in &previous_tags {
                transaction.srem(self.get_tag_key(tag), [key]).forget();
            }
            for tag in &tags {
                transaction.sadd(self.get_tag_key(tag), [key]).forget();
            }
            if self.try_execute(transaction).await? {
                debug!(key, etag = %etag, tags = tags.len(), "stored cache entry");
                return Ok(etag);
            }
            debug!(key, attempt, "entry changed during write, retrying");
        }
        Err(Self::contended(key))
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let record = self.fetch_record(key).await?;
        if record.is_empty() {
            return Ok(None);
        }

        let entry = match Self::decode_record(&record) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "malformed cache record, treating as absent");
                return Ok(None);
            }
        };

        if entry.is_expired(self.clock.now()) {
            self.remove_entry(key, &entry.tags).await?;
            debug!(key, "purged expired cache entry");
            return Ok(None);
        }

        Ok(Some(entry))
    }

    async fn invalidate_key(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.remove_entry(key, &[]).await
    }

    async fn invalidate_tag(&self, tags: &[String]) -> Result<(), StoreError> {
        // Snapshot the affected keys before touching any set
        let mut affected: HashSet<String> = HashSet::new();
        for tag in tags {
            let keys: HashSet<String> =
                self.client.smembers(self.get_tag_key(tag)).await?;
            affected.extend(keys);
        }

        for key in &affected {
            self.remove_entry(key, tags).await?;
        }

        debug!(?tags, invalidated = affected.len(), "invalidated tags");
        Ok(())
    }

    async fn get_keys_by_tag(&self, tag: &str) -> Result<HashSet<String>, StoreError> {
        let keys: HashSet<String> = self.client.smembers(self.get_tag_key(tag)).await?;
        Ok(keys)
    }
}

impl<S> std::fmt::Debug for RedisCacheStore<S>
where
    S: RecordSerializer,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("key_prefix", &self.key_prefix)
            .field("clock", &self.clock)
            .finish()
    }
}
