//! Cache stores for the HTTP accelerator.
//!
//! A store owns cached responses together with a tag index that maps
//! invalidation labels to the cache keys carrying them. All backends
//! implement [`CacheStore`] and behave identically for every operation.
//!
//! Currently supported backends:
//! - In-memory (always available)
//! - Redis (with the "redis" feature)

pub mod backend;
mod clock;
mod entry;
mod error;
mod fingerprint;
pub mod serializers;
mod store;

pub use crate::backend::InMemoryCacheStore;
#[cfg(feature = "redis")]
pub use crate::backend::RedisCacheStore;
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::entry::{CacheEntry, Expiry, Ttl};
pub use crate::error::StoreError;
pub use crate::fingerprint::fingerprint;
pub use crate::store::{AbstractCacheStore, CacheStore};

// Re-export
pub use bytes;
pub use http::StatusCode;
#[cfg(feature = "redis")]
pub use rustis;
