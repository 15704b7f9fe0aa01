//! Fetcher seam and cancellation context.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use camper_core::{CamperError, CamperResult};
use tokio_util::sync::CancellationToken;

/// Cancellation scope carried by every fetch and remote call.
///
/// Contexts form a tree: canceling a realm's context cancels every child
/// handed out below it, which is how session teardown stops in-flight work.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    token: CancellationToken,
}

impl FetchContext {
    /// A root context that is only canceled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// A context canceled together with this one, or on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is canceled.
    pub async fn canceled(&self) {
        self.token.cancelled().await;
    }

    /// Fails with [`CamperError::Canceled`] if the context is already canceled.
    pub fn check(&self) -> CamperResult<()> {
        if self.is_canceled() {
            Err(CamperError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Drives `fut` until it finishes or this context is canceled.
    pub async fn run<T, F>(&self, fut: F) -> CamperResult<T>
    where
        F: Future<Output = CamperResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(CamperError::Canceled),
            result = fut => result,
        }
    }
}

/// Loads the value behind one pool.
///
/// Supplied once when the pool is built; the pool calls it on every refresh.
#[async_trait]
pub trait Fetcher<T>: Send + Sync {
    async fn fetch(&self, ctx: &FetchContext) -> CamperResult<T>;
}

/// Adapts an async closure into a [`Fetcher`].
pub struct FnFetcher<F> {
    f: F,
}

#[async_trait]
impl<T, F, Fut> Fetcher<T> for FnFetcher<F>
where
    T: Send + 'static,
    F: Fn(FetchContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CamperResult<T>> + Send + 'static,
{
    async fn fetch(&self, ctx: &FetchContext) -> CamperResult<T> {
        (self.f)(ctx.clone()).await
    }
}

/// Wrap a closure as a shareable fetcher.
///
/// ```ignore
/// let fetcher = fetcher_fn(move |ctx| {
///     let client = client.clone();
///     async move { client.list_todos(&ctx, &scope).await }
/// });
/// ```
pub fn fetcher_fn<T, F, Fut>(f: F) -> Arc<dyn Fetcher<T>>
where
    T: Send + 'static,
    F: Fn(FetchContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CamperResult<T>> + Send + 'static,
{
    Arc::new(FnFetcher { f })
}
