//! This module defines the `Handler` trait: the application code the
//! accelerator sits in front of. A handler turns a request into a fully
//! materialized response and may leave caching advice in [`CacheHints`].

use crate::request::{CacheHints, CacheRequest, HandlerResponse};
use async_trait::async_trait;

/// Application request handler wrapped by the accelerator.
///
/// # Examples
///
/// ```no_run
/// use accelerator::{CacheHints, CacheRequest, Handler, HandlerResponse};
/// use async_trait::async_trait;
///
/// struct Hello;
///
/// #[async_trait]
/// impl Handler for Hello {
///     type Error = std::io::Error;
///
///     async fn handle(
///         &self,
///         _req: &CacheRequest,
///         hints: &mut CacheHints,
///     ) -> Result<HandlerResponse, Self::Error> {
///         hints.cache_for(60).tag("greetings");
///         Ok(HandlerResponse::ok("hello"))
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync {
    type Error: Send;

    /// Produce a response for `req`. Errors are handed back to the caller of
    /// the accelerator untouched.
    async fn handle(
        &self,
        req: &CacheRequest,
        hints: &mut CacheHints,
    ) -> Result<HandlerResponse, Self::Error>;
}

/// Adapter turning a plain closure into a [`Handler`].
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, E>(f: F) -> FnHandler<F>
where
    F: Fn(&CacheRequest, &mut CacheHints) -> Result<HandlerResponse, E> + Send + Sync,
    E: Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, E> Handler for FnHandler<F>
where
    F: Fn(&CacheRequest, &mut CacheHints) -> Result<HandlerResponse, E> + Send + Sync,
    E: Send,
{
    type Error = E;

    async fn handle(
        &self,
        req: &CacheRequest,
        hints: &mut CacheHints,
    ) -> Result<HandlerResponse, Self::Error> {
        (self.f)(req, hints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use std::io;

    struct EchoHandler;

    #[async_trait]
    impl Handler for EchoHandler {
        type Error = io::Error;

        async fn handle(
            &self,
            req: &CacheRequest,
            hints: &mut CacheHints,
        ) -> Result<HandlerResponse, Self::Error> {
            if req.path == "/error" {
                return Err(io::Error::other("Error triggered"));
            }
            hints.cache_for(5);
            Ok(HandlerResponse::ok(format!("Processed: {}", req.path)))
        }
    }

    #[tokio::test]
    async fn test_successful_handle() {
        let mut hints = CacheHints::default();
        let result = EchoHandler
            .handle(&CacheRequest::get("/page"), &mut hints)
            .await
            .unwrap();
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(result.body[0], "Processed: /page");
        assert_eq!(hints.cache_for, Some(5));
    }

    #[tokio::test]
    async fn test_error_handle() {
        let mut hints = CacheHints::default();
        let result = EchoHandler
            .handle(&CacheRequest::get("/error"), &mut hints)
            .await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::Other);
        assert_eq!(hints.cache_for, None);
    }

    #[tokio::test]
    async fn test_handler_fn() {
        let handler = handler_fn(|req: &CacheRequest, hints: &mut CacheHints| {
            hints.tag("fn");
            Ok::<_, io::Error>(HandlerResponse::ok(req.query.clone()))
        });
        let mut hints = CacheHints::default();
        let result = handler
            .handle(&CacheRequest::get("/q?x=1"), &mut hints)
            .await
            .unwrap();
        assert_eq!(result.body[0], "x=1");
        assert_eq!(hints.tags, vec!["fn"]);
    }
}
