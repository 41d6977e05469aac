//! # accelerator
//!
//! An HTTP response cache that sits in front of an application request
//! handler. Responses the handler marks as cacheable are stored together with
//! an MD5 etag and a set of tags; later requests for the same path and query
//! are replayed from the store, conditional requests get `304 Not Modified`,
//! and whole groups of entries can be dropped by tag.
//!
//! ## Features
//!
//! - **Pluggable stores**: in-memory, or Redis with the `redis` feature.
//! - **Tag invalidation**: drop every entry carrying any of a set of tags.
//! - **Conditional requests**: validator matching against the stored etag.
//! - **Explicit policy**: only `GET`, only 2xx, only with a positive TTL
//!   hint, and never with a deny-listed header such as `Set-Cookie`.
//! - **tower integration**: an accelerator is a `tower::Service`.
//!
//! ## Modules
//!
//! - `config`: YAML configuration and typed settings.
//! - `store`: the `CacheStore` contract and its backends.
pub mod error;
pub mod handler;
pub mod interceptor;
pub mod policy;
pub mod request;
pub mod service;
pub mod stats;

pub use accelerator_config as config;
pub use accelerator_store as store;

pub use crate::error::AcceleratorError;
pub use crate::handler::{FnHandler, Handler, handler_fn};
pub use crate::interceptor::{
    Accelerator, AcceleratorOptions, AcceleratorOptionsBuilder,
    AcceleratorOptionsBuilderError, ETAG_HEADER, store_from_settings,
};
pub use crate::policy::{CachePolicy, Ineligible};
pub use crate::request::{
    AcceleratedResponse, CacheHints, CacheOutcome, CacheRequest, ETAG_REQUEST_HEADER,
    HandlerResponse,
};
pub use crate::stats::{CacheStats, CacheStatsSnapshot};
pub use accelerator_config::{AcceleratorSettings, BackendSettings};
pub use accelerator_store::{
    AbstractCacheStore, CacheStore, InMemoryCacheStore, StoreError, Ttl,
};
#[cfg(feature = "redis")]
pub use accelerator_store::RedisCacheStore;

// re-export
pub use async_trait;
pub use bytes;
pub use http;
#[cfg(feature = "redis")]
pub use rustis;
pub use tower;
pub use tracing;
