//! Caching eligibility rules applied to a freshly produced response.

use accelerator_config::DEFAULT_DENY_HEADERS;
use accelerator_store::Ttl;
use http::{Method, StatusCode};

use crate::request::CacheHints;

/// Why a response was not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligible {
    /// No positive advisory TTL from the handler
    NoTtl,
    Method(Method),
    Status(StatusCode),
    /// Response carried a header on the deny-list
    DeniedHeader(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    deny_headers: Vec<String>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DENY_HEADERS.iter().map(|h| h.to_string()).collect())
    }
}

impl CachePolicy {
    pub fn new(deny_headers: Vec<String>) -> Self {
        Self { deny_headers }
    }

    pub fn deny_headers(&self) -> &[String] {
        &self.deny_headers
    }

    fn is_denied(&self, name: &str) -> bool {
        self.deny_headers
            .iter()
            .any(|denied| denied.eq_ignore_ascii_case(name))
    }

    /// Returns the TTL to store with when every rule passes.
    pub fn check(
        &self,
        method: &Method,
        status: StatusCode,
        headers: &[(String, String)],
        hints: &CacheHints,
    ) -> Result<Ttl, Ineligible> {
        let ttl = hints.ttl();
        if !ttl.is_cacheable() {
            return Err(Ineligible::NoTtl);
        }
        if *method != Method::GET {
            return Err(Ineligible::Method(method.clone()));
        }
        if status.as_u16() / 100 != 2 {
            return Err(Ineligible::Status(status));
        }
        if let Some((name, _)) = headers.iter().find(|(name, _)| self.is_denied(name)) {
            return Err(Ineligible::DeniedHeader(name.clone()));
        }
        Ok(ttl)
    }
}
