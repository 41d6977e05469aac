//! Run with `cargo run --example basic [config.yml]`
//! and `RUST_LOG=accelerator=debug` to see cache decisions.
use accelerator::{
    Accelerator, AcceleratorSettings, CacheHints, CacheRequest, Handler, HandlerResponse,
    async_trait::async_trait, tracing,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Pretends to render an article page; every render bumps a counter.
#[derive(Default)]
struct ArticleHandler {
    renders: AtomicU64,
}

#[async_trait]
impl Handler for ArticleHandler {
    type Error = std::io::Error;

    async fn handle(
        &self,
        req: &CacheRequest,
        hints: &mut CacheHints,
    ) -> Result<HandlerResponse, Self::Error> {
        let render = self.renders.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(slug) = req.path.strip_prefix("/articles/") else {
            return Ok(HandlerResponse::new(accelerator::http::StatusCode::NOT_FOUND));
        };
        hints.cache_for(30).tag("articles").tag(format!("article:{slug}"));
        Ok(HandlerResponse::ok(format!("<h1>{slug}</h1><p>render #{render}</p>"))
            .with_header("Content-Type", "text/html"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => AcceleratorSettings::from_yaml_file(path)?,
        None => AcceleratorSettings::default(),
    };
    let accelerator = Accelerator::from_settings(&settings, ArticleHandler::default()).await?;

    let first = accelerator.handle(&CacheRequest::get("/articles/rust")).await?;
    let etag = first.header("ETag").unwrap_or_default().to_string();
    tracing::info!(outcome = ?first.outcome, etag = %etag, "first request");

    let second = accelerator.handle(&CacheRequest::get("/articles/rust")).await?;
    tracing::info!(
        outcome = ?second.outcome,
        body = %String::from_utf8_lossy(&second.body_bytes()),
        "second request"
    );

    let revalidated = accelerator
        .handle(&CacheRequest::get("/articles/rust").with_validator(etag))
        .await?;
    tracing::info!(status = %revalidated.status, "conditional request");

    accelerator.invalidate_tag(&["articles".to_string()]).await?;
    let after = accelerator.handle(&CacheRequest::get("/articles/rust")).await?;
    tracing::info!(
        outcome = ?after.outcome,
        body = %String::from_utf8_lossy(&after.body_bytes()),
        "after invalidation"
    );

    println!("{}", serde_json::to_string_pretty(&accelerator.stats())?);
    Ok(())
}
