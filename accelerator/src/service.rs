//! Lets an accelerator sit in a tower service stack.
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::Service;

use crate::{
    error::AcceleratorError, handler::Handler, interceptor::Accelerator,
    request::{AcceleratedResponse, CacheRequest},
};

pub type AcceleratorFuture<E> = Pin<
    Box<dyn Future<Output = Result<AcceleratedResponse, AcceleratorError<E>>> + Send>,
>;

impl<H> Service<CacheRequest> for Accelerator<H>
where
    H: Handler + 'static,
    H::Error: 'static,
{
    type Response = AcceleratedResponse;
    type Error = AcceleratorError<H::Error>;
    type Future = AcceleratorFuture<H::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CacheRequest) -> Self::Future {
        let accelerator = self.clone();
        Box::pin(async move { accelerator.handle(&req).await })
    }
}
