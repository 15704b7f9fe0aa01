//! Optimistic mutations with explicit rollback.
//!
//! A [`MutatingPool`] wraps a [`Pool`] and tracks every mutation the server
//! has not confirmed yet. It keeps the last server-confirmed value as a base:
//! the visible data is always that base with the pending mutations replayed
//! on top. When one mutation fails, it is dropped from the list and the data
//! is rebuilt, so concurrent edits to the same pool survive each other's
//! rollbacks.
//!
//! A mutation the server confirmed is not dropped right away. Fetches that
//! were already running may return data from before the change, so the
//! mutation keeps being replayed until a fetch started after the
//! confirmation lands. Re-fetches always go through [`Pool::fetch`].

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use camper_core::{CacheError, CamperError, CamperResult, Timestamp};
use chrono::Utc;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::fetcher::{FetchContext, Fetcher};
use crate::message::{CacheEvent, Completion, CompletionKind};
use crate::pool::{FetchOutcome, FetchTask, Pool, PoolConfig};
use crate::snapshot::Snapshot;

/// A change to a pool's value that is shown before the server confirms it.
#[async_trait]
pub trait Mutation<T>: Send + Sync {
    /// Produce the optimistic value. Must be pure: it is replayed on rebuilds.
    fn apply_locally(&self, current: &T) -> T;

    /// Perform the change on the server.
    async fn apply_remotely(&self, ctx: &FetchContext) -> CamperResult<()>;

    /// True once fetched server data already contains this change.
    ///
    /// Pending mutations that report false are replayed on top of every
    /// fetch until they are confirmed or fail.
    fn is_reflected_in(&self, _remote: &T) -> bool {
        false
    }

    /// Whether a confirmed mutation should re-fetch to pick up server-computed fields.
    fn refetch_on_success(&self) -> bool {
        true
    }
}

/// The values a mutation moved between when it was applied.
///
/// `prior` is what the pool showed before, `optimistic` what it shows now.
#[derive(Debug)]
pub struct MutationTicket<T> {
    id: u64,
    prior: Arc<T>,
    optimistic: Arc<T>,
}

impl<T> Clone for MutationTicket<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            prior: Arc::clone(&self.prior),
            optimistic: Arc::clone(&self.optimistic),
        }
    }
}

impl<T> MutationTicket<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn prior(&self) -> &T {
        &self.prior
    }

    pub fn optimistic(&self) -> &T {
        &self.optimistic
    }
}

/// How the remote half of a mutation ended.
#[derive(Debug)]
pub enum MutationResult {
    Confirmed,
    Failed(CamperError),
    Canceled,
}

/// Result of one background mutation, addressed to its pool.
#[derive(Debug)]
pub struct MutationOutcome<T> {
    pub(crate) key: String,
    pub(crate) id: u64,
    pub(crate) generation: u64,
    pub(crate) refetch: bool,
    pub(crate) elapsed: Duration,
    pub(crate) result: MutationResult,
    _payload: PhantomData<fn() -> T>,
}

impl<T> MutationOutcome<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn result(&self) -> &MutationResult {
        &self.result
    }
}

impl<T: Send + 'static> MutationOutcome<T> {
    pub(crate) fn into_completion(self) -> Completion {
        let failed = matches!(self.result, MutationResult::Failed(_));
        let canceled = matches!(self.result, MutationResult::Canceled);
        Completion::new(
            self.key.clone(),
            CompletionKind::Mutation,
            self.elapsed,
            failed,
            canceled,
            Box::new(self),
        )
    }
}

/// A mutation whose local half is applied and whose remote half is pending.
pub struct MutationTask<T> {
    ticket: MutationTicket<T>,
    key: String,
    future: BoxFuture<'static, MutationOutcome<T>>,
}

impl<T: Send + 'static> MutationTask<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ticket(&self) -> &MutationTicket<T> {
        &self.ticket
    }

    /// Erase the payload type so the task can ride the event loop.
    pub fn into_completion(self) -> BoxFuture<'static, Completion> {
        self.future.map(MutationOutcome::into_completion).boxed()
    }
}

impl<T> Future for MutationTask<T> {
    type Output = MutationOutcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().future.as_mut().poll(cx)
    }
}

struct PendingMutation<T> {
    id: u64,
    mutation: Arc<dyn Mutation<T>>,
    /// Set once the server confirmed the change: the sequence number of the
    /// latest fetch started before that. Fetches up to it may predate the change.
    confirmed_after: Option<u64>,
}

impl<T> PendingMutation<T> {
    /// Whether fetched data from fetch `seq` lets this mutation go.
    fn settled_by(&self, seq: u64, remote: &T) -> bool {
        match self.confirmed_after {
            Some(after) => seq > after || self.mutation.is_reflected_in(remote),
            None => self.mutation.is_reflected_in(remote),
        }
    }
}

/// A pool that accepts optimistic mutations.
pub struct MutatingPool<T> {
    pool: Pool<T>,
    pending: Vec<PendingMutation<T>>,
    /// Last value the server confirmed; `None` until the first mutation.
    base: Option<Arc<T>>,
    next_id: u64,
}

impl<T: Send + Sync + 'static> MutatingPool<T> {
    pub fn new(key: impl Into<String>, config: PoolConfig, fetcher: Arc<dyn Fetcher<T>>) -> Self {
        Self {
            pool: Pool::new(key, config, fetcher),
            pending: Vec::new(),
            base: None,
            next_id: 0,
        }
    }

    /// The underlying pool, for read-only inspection.
    pub fn pool(&self) -> &Pool<T> {
        &self.pool
    }

    pub fn key(&self) -> &str {
        self.pool.key()
    }

    pub fn version(&self) -> u64 {
        self.pool.version()
    }

    pub fn get(&self) -> Snapshot<T> {
        self.pool.get()
    }

    pub fn get_at(&self, now: Timestamp) -> Snapshot<T> {
        self.pool.get_at(now)
    }

    /// Number of mutations waiting on the server.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Install a server-confirmed value. Pending mutations are replayed on it.
    pub fn set(&mut self, value: T) {
        let remote = Arc::new(value);
        let data = self.rebase(remote);
        self.pool.set_shared(data);
    }

    pub fn invalidate(&mut self) {
        self.pool.invalidate();
    }

    /// Drop data, base and pending mutations. Late completions are discarded.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.base = None;
        self.pool.clear();
    }

    pub fn fetch(&mut self, ctx: &FetchContext) -> Option<FetchTask<T>> {
        self.pool.fetch(ctx)
    }

    pub fn fetch_if_stale(&mut self, ctx: &FetchContext) -> Option<FetchTask<T>> {
        self.pool.fetch_if_stale(ctx)
    }

    /// Apply fetched data, pruning settled mutations and replaying the rest.
    ///
    /// Answers [`CacheEvent::RefreshNeeded`] when a confirmed mutation
    /// outlived the fetch because the fetch started before the confirmation.
    pub fn complete_fetch(&mut self, outcome: FetchOutcome<T>) -> Option<CacheEvent> {
        let seq = outcome.seq;
        let succeeded = outcome.result.is_ok();
        let Self { pool, pending, base, .. } = self;
        let event = pool.complete_fetch_with(outcome, |remote| {
            let remote = Arc::new(remote);
            *base = Some(Arc::clone(&remote));
            pending.retain(|p| !p.settled_by(seq, &remote));
            replay(&remote, pending)
        })?;
        if succeeded && self.awaiting_refresh() {
            self.pool.invalidate();
            tracing::debug!(key = %self.key(), fetch_seq = seq, "fetch predates a confirmed mutation");
            return Some(self.refresh_needed());
        }
        Some(event)
    }

    /// Apply a mutation optimistically and return its remote half.
    ///
    /// Fails with [`CacheError::NotUsable`] when the snapshot is not usable,
    /// including data past its stale TTL. The pool state is left as it was;
    /// only the data changes.
    pub fn apply<M>(&mut self, ctx: &FetchContext, mutation: M) -> CamperResult<MutationTask<T>>
    where
        M: Mutation<T> + 'static,
    {
        self.apply_at(ctx, mutation, Utc::now())
    }

    /// Like [`MutatingPool::apply`], judging usability at `now`.
    pub fn apply_at<M>(
        &mut self,
        ctx: &FetchContext,
        mutation: M,
        now: Timestamp,
    ) -> CamperResult<MutationTask<T>>
    where
        M: Mutation<T> + 'static,
    {
        let snap = self.pool.get_at(now);
        let Some(prior) = snap.shared().filter(|_| snap.usable()) else {
            return Err(CacheError::NotUsable {
                key: self.key().to_string(),
            }
            .into());
        };
        if self.base.is_none() {
            self.base = Some(Arc::clone(&prior));
        }

        self.next_id += 1;
        let id = self.next_id;
        let optimistic = Arc::new(mutation.apply_locally(&prior));
        self.pool.replace_data(Arc::clone(&optimistic));

        let mutation: Arc<dyn Mutation<T>> = Arc::new(mutation);
        self.pending.push(PendingMutation {
            id,
            mutation: Arc::clone(&mutation),
            confirmed_after: None,
        });
        tracing::debug!(key = %self.key(), mutation_id = id, pending = self.pending.len(), "mutation applied locally");

        let ctx = ctx.clone();
        let key = self.key().to_string();
        let generation = self.pool.generation();
        let refetch = mutation.refetch_on_success();
        let future = async move {
            let started = Instant::now();
            let result = match ctx.run(mutation.apply_remotely(&ctx)).await {
                Ok(()) => MutationResult::Confirmed,
                Err(err) if err.is_canceled() => MutationResult::Canceled,
                Err(err) => MutationResult::Failed(err),
            };
            MutationOutcome {
                key,
                id,
                generation,
                refetch,
                elapsed: started.elapsed(),
                result,
                _payload: PhantomData,
            }
        }
        .boxed();

        Ok(MutationTask {
            ticket: MutationTicket {
                id,
                prior,
                optimistic,
            },
            key: self.key().to_string(),
            future,
        })
    }

    /// Apply the remote half's outcome.
    ///
    /// A confirmed mutation that asked for a re-fetch, or that raced a fetch
    /// still in flight, stays replayed and is answered with
    /// [`CacheEvent::RefreshNeeded`]; the caller then runs
    /// [`MutatingPool::fetch_if_stale`]. A failed mutation is rolled back and reported as
    /// [`CacheEvent::MutationFailed`]. A canceled one is rolled back and the
    /// pool invalidated, without an error. Outcomes from before a
    /// [`MutatingPool::clear`] are dropped.
    pub fn complete_mutation(&mut self, outcome: MutationOutcome<T>) -> Option<CacheEvent> {
        if outcome.generation != self.pool.generation() {
            tracing::debug!(key = %self.key(), mutation_id = outcome.id, "discarding mutation from older generation");
            return None;
        }

        match outcome.result {
            MutationResult::Confirmed if outcome.refetch || self.pool.is_in_flight() => {
                let after = self.pool.fetch_seq();
                if let Some(p) = self.pending.iter_mut().find(|p| p.id == outcome.id) {
                    p.confirmed_after = Some(after);
                }
                self.pool.invalidate();
                tracing::debug!(key = %self.key(), mutation_id = outcome.id, "mutation confirmed, awaiting refresh");
                Some(self.refresh_needed())
            }
            MutationResult::Confirmed => {
                if let Some(confirmed) = self.forget(outcome.id) {
                    if let Some(base) = self.base.take() {
                        self.base = Some(Arc::new(confirmed.mutation.apply_locally(&base)));
                    }
                }
                tracing::debug!(key = %self.key(), mutation_id = outcome.id, "mutation confirmed without refetch");
                Some(self.pool.updated())
            }
            MutationResult::Failed(error) => {
                self.forget(outcome.id);
                self.rebuild();
                tracing::warn!(key = %self.key(), mutation_id = outcome.id, error = %error, "mutation rolled back");
                Some(CacheEvent::MutationFailed {
                    key: self.key().to_string(),
                    error,
                })
            }
            MutationResult::Canceled => {
                self.forget(outcome.id);
                self.rebuild();
                self.pool.invalidate();
                tracing::debug!(key = %self.key(), mutation_id = outcome.id, "mutation canceled");
                Some(self.pool.updated())
            }
        }
    }

    fn awaiting_refresh(&self) -> bool {
        self.pending.iter().any(|p| p.confirmed_after.is_some())
    }

    fn refresh_needed(&self) -> CacheEvent {
        CacheEvent::RefreshNeeded {
            key: self.key().to_string(),
        }
    }

    fn forget(&mut self, id: u64) -> Option<PendingMutation<T>> {
        let index = self.pending.iter().position(|p| p.id == id)?;
        Some(self.pending.remove(index))
    }

    /// Make `remote` the confirmed base and return it with pending mutations replayed.
    ///
    /// `remote` is newer than every confirmation, so confirmed mutations go.
    fn rebase(&mut self, remote: Arc<T>) -> Arc<T> {
        self.base = Some(Arc::clone(&remote));
        self.pending
            .retain(|p| p.confirmed_after.is_none() && !p.mutation.is_reflected_in(&remote));
        replay(&remote, &self.pending)
    }

    /// Recompute the visible data from the base and the surviving mutations.
    fn rebuild(&mut self) {
        if let Some(base) = &self.base {
            let data = replay(base, &self.pending);
            self.pool.replace_data(data);
        }
        if self.pending.is_empty() {
            self.base = None;
        }
    }
}

fn replay<T>(base: &Arc<T>, pending: &[PendingMutation<T>]) -> Arc<T> {
    let mut iter = pending.iter();
    let Some(first) = iter.next() else {
        return Arc::clone(base);
    };
    let mut value = first.mutation.apply_locally(base);
    for p in iter {
        value = p.mutation.apply_locally(&value);
    }
    Arc::new(value)
}

// ============================================================================
// TESTS
// ============================================================================
