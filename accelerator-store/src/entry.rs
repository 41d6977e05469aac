use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::StatusCode;

/// Timestamp stored in place of an expiry for entries that never expire.
pub const NEVER_EXPIRES: i64 = -1;

/// How long a response should stay cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Seconds from write time. Zero or negative means "do not cache".
    Seconds(i64),
    /// Keep until explicitly invalidated.
    Forever,
}

impl Ttl {
    pub fn is_cacheable(&self) -> bool {
        match self {
            Ttl::Seconds(secs) => *secs > 0,
            Ttl::Forever => true,
        }
    }
}

impl From<i64> for Ttl {
    fn from(secs: i64) -> Self {
        Ttl::Seconds(secs)
    }
}

/// Absolute expiry of a cached entry, whole-second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    At(DateTime<Utc>),
}

impl Expiry {
    /// Resolve a TTL against the write time. Returns `None` for TTLs that
    /// must not produce an entry. Positive TTLs past the last representable
    /// instant are clamped to it.
    pub fn from_ttl(ttl: Ttl, now: DateTime<Utc>) -> Option<Self> {
        match ttl {
            Ttl::Forever => Some(Expiry::Never),
            Ttl::Seconds(secs) if secs > 0 => {
                let ts = now
                    .timestamp()
                    .saturating_add(secs)
                    .min(DateTime::<Utc>::MAX_UTC.timestamp());
                Some(DateTime::from_timestamp(ts, 0).map_or(Expiry::Never, Expiry::At))
            }
            Ttl::Seconds(_) => None,
        }
    }

    /// Expired iff `now` is strictly past the expiry second.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(at) => now.timestamp() > at.timestamp(),
        }
    }

    pub fn to_timestamp(&self) -> i64 {
        match self {
            Expiry::Never => NEVER_EXPIRES,
            Expiry::At(at) => at.timestamp(),
        }
    }

    pub fn from_timestamp(ts: i64) -> Option<Self> {
        if ts == NEVER_EXPIRES {
            return Some(Expiry::Never);
        }
        if ts < 0 {
            return None;
        }
        DateTime::from_timestamp(ts, 0).map(Expiry::At)
    }
}

/// A cached response. Entries are never mutated after being written; a new
/// `set` for the same key replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub status: StatusCode,
    /// Header pairs in original order, duplicates kept
    pub headers: Vec<(String, String)>,
    /// Body chunks as produced by the handler
    pub body: Vec<Bytes>,
    pub expire_at: Expiry,
    /// Hex MD5 of the concatenated body
    pub etag: String,
    pub tags: Vec<String>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_at.is_expired(now)
    }

    /// Total body length in bytes.
    pub fn body_len(&self) -> usize {
        self.body.iter().map(Bytes::len).sum()
    }

    /// Body chunks joined into one buffer.
    pub fn body_bytes(&self) -> Bytes {
        match self.body.as_slice() {
            [] => Bytes::new(),
            [single] => single.clone(),
            chunks => Bytes::from(chunks.concat()),
        }
    }
}

/// Deduplicate tags while keeping first-seen order.
pub(crate) fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .filter(|tag| seen.insert(tag.as_str()))
        .cloned()
        .collect()
}
