pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryCacheStore;
#[cfg(feature = "redis")]
pub use redis::{DEFAULT_KEY_PREFIX, RedisCacheStore};
