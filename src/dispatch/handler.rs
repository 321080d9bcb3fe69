//! Handler and filter signatures.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::dispatch::{Context, Request, Response};

/// Error type returned by handlers and filters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Decision of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run the next filter, or the endpoint after the last one.
    Continue,
    /// End dispatch here. The filter has written the response.
    Stop,
}

/// An endpoint.
///
/// Implemented for every `Fn(Arc<Request>, Response, Context) -> impl Future`.
pub trait Handler: Send + Sync + 'static {
    fn call(
        &self,
        request: Arc<Request>,
        response: Response,
        ctx: Context,
    ) -> BoxFuture<'static, Result<(), BoxError>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Arc<Request>, Response, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn call(
        &self,
        request: Arc<Request>,
        response: Response,
        ctx: Context,
    ) -> BoxFuture<'static, Result<(), BoxError>> {
        Box::pin(self(request, response, ctx))
    }
}

/// A pre-endpoint check. Same inputs as a [`Handler`], returns a [`Flow`].
pub trait Filter: Send + Sync + 'static {
    fn call(
        &self,
        request: Arc<Request>,
        response: Response,
        ctx: Context,
    ) -> BoxFuture<'static, Result<Flow, BoxError>>;
}

impl<F, Fut> Filter for F
where
    F: Fn(Arc<Request>, Response, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Flow, BoxError>> + Send + 'static,
{
    fn call(
        &self,
        request: Arc<Request>,
        response: Response,
        ctx: Context,
    ) -> BoxFuture<'static, Result<Flow, BoxError>> {
        Box::pin(self(request, response, ctx))
    }
}
