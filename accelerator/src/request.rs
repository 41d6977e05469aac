//! Request and response shapes exchanged with the wrapped handler.

use accelerator_store::{CacheEntry, Ttl};
use bytes::Bytes;
use http::{Method, StatusCode, header};

/// Legacy request header some clients use to send the validator back.
pub const ETAG_REQUEST_HEADER: &str = "etag";

/// The parts of an incoming request the accelerator looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    pub method: Method,
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: String,
    /// Conditional validator sent by the client, compared against the etag
    pub validator: Option<String>,
}

impl CacheRequest {
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, query),
            None => (path_and_query, ""),
        };
        Self {
            method,
            path: path.to_string(),
            query: query.to_string(),
            validator: None,
        }
    }

    pub fn get(path_and_query: &str) -> Self {
        Self::new(Method::GET, path_and_query)
    }

    pub fn post(path_and_query: &str) -> Self {
        Self::new(Method::POST, path_and_query)
    }

    pub fn with_validator(mut self, validator: impl Into<String>) -> Self {
        self.validator = Some(validator.into());
        self
    }

    /// Build from HTTP request parts. The validator comes from
    /// `If-None-Match`, or from an `ETag` request header when absent.
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        let validator = parts
            .headers
            .get(header::IF_NONE_MATCH)
            .or_else(|| parts.headers.get(ETAG_REQUEST_HEADER))
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string());

        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().unwrap_or("").to_string(),
            validator,
        }
    }

    /// Whether the request validator names `etag`. Accepts the raw hex digest
    /// as well as the quoted, weak (`W/`) and comma-separated list forms of
    /// `If-None-Match`; `*` matches any stored entry.
    pub fn matches_etag(&self, etag: &str) -> bool {
        let Some(validator) = self.validator.as_deref() else {
            return false;
        };
        validator.split(',').any(|candidate| {
            let candidate = candidate.trim();
            let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
            candidate == "*" || candidate.trim_matches('"') == etag
        })
    }

    /// Key identifying this request in the store: the path, plus `?query`
    /// when a query string is present.
    pub fn cache_key(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }
}

/// Out-of-band advice the handler may leave for the accelerator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheHints {
    /// Seconds to keep the response; absent or non-positive means do not cache
    pub cache_for: Option<i64>,
    pub tags: Vec<String>,
}

impl CacheHints {
    pub fn cache_for(&mut self, secs: i64) -> &mut Self {
        self.cache_for = Some(secs);
        self
    }

    pub fn tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tags.push(tag.into());
        self
    }

    pub fn ttl(&self) -> Ttl {
        Ttl::Seconds(self.cache_for.unwrap_or(-1))
    }
}

/// Fully materialized handler output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<Bytes>,
}

impl HandlerResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK).with_chunk(body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_chunk(mut self, chunk: impl Into<Bytes>) -> Self {
        self.body.push(chunk.into());
        self
    }
}

/// How a response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Replayed from the store
    Hit,
    /// Validator matched the stored etag
    NotModified,
    /// Handler ran and the response was stored
    Stored,
    /// Handler ran and the response was not stored
    Miss,
}

/// What the accelerator sends back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceleratedResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<Bytes>,
    pub outcome: CacheOutcome,
}

impl AcceleratedResponse {
    pub(crate) fn not_modified() -> Self {
        Self {
            status: StatusCode::NOT_MODIFIED,
            headers: Vec::new(),
            body: Vec::new(),
            outcome: CacheOutcome::NotModified,
        }
    }

    pub(crate) fn from_entry(entry: CacheEntry) -> Self {
        Self {
            status: entry.status,
            headers: entry.headers,
            body: entry.body,
            outcome: CacheOutcome::Hit,
        }
    }

    pub(crate) fn fresh(response: HandlerResponse, outcome: CacheOutcome) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            outcome,
        }
    }

    /// First value of header `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_bytes(&self) -> Bytes {
        match self.body.as_slice() {
            [] => Bytes::new(),
            [single] => single.clone(),
            chunks => Bytes::from(chunks.concat()),
        }
    }

    /// Convert into an `http::Response`. Header pairs that are not valid
    /// HTTP are dropped.
    pub fn into_http(self) -> http::Response<Bytes> {
        let body = self.body_bytes();
        let mut response = http::Response::new(body);
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                header::HeaderName::from_bytes(name.as_bytes()),
                header::HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }
        response
    }
}
