//! Stale-while-revalidate pool for a single key.
//!
//! A pool owns one cache entry and the fetcher that refreshes it. It lives
//! on the event loop: every method takes `&mut self` and none of them block.
//! Refreshing is split in two halves. [`Pool::fetch`] marks the entry as
//! loading and returns a [`FetchTask`] to be driven in the background;
//! once the task resolves, its [`FetchOutcome`] comes back through the loop
//! and [`Pool::complete_fetch`] applies it.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use camper_core::{CamperError, CamperResult, Timestamp};
use chrono::Utc;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::fetcher::{FetchContext, Fetcher};
use crate::message::{CacheEvent, Completion, CompletionKind};
use crate::snapshot::{Snapshot, SnapshotState};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Draw a generation that no other pool in this process has used.
pub(crate) fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Freshness policy for a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolConfig {
    /// How long fetched data counts as fresh. Zero means it never goes stale.
    pub fresh_ttl: Duration,
    /// How long stale data is still shown after `fresh_ttl`. Zero keeps it forever.
    pub stale_ttl: Duration,
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fresh TTL.
    pub fn with_fresh_ttl(mut self, ttl: Duration) -> Self {
        self.fresh_ttl = ttl;
        self
    }

    /// Set the stale TTL.
    pub fn with_stale_ttl(mut self, ttl: Duration) -> Self {
        self.stale_ttl = ttl;
        self
    }
}

/// Result of one background fetch, addressed to the pool that started it.
#[derive(Debug)]
pub struct FetchOutcome<T> {
    pub(crate) key: String,
    pub(crate) generation: u64,
    /// Position of this fetch among the ones its pool has started.
    pub(crate) seq: u64,
    pub(crate) elapsed: Duration,
    pub(crate) result: CamperResult<T>,
}

impl<T> FetchOutcome<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn result(&self) -> &CamperResult<T> {
        &self.result
    }
}

impl<T: Send + 'static> FetchOutcome<T> {
    pub(crate) fn into_completion(self) -> Completion {
        let failed = matches!(&self.result, Err(err) if !err.is_canceled());
        let canceled = matches!(&self.result, Err(err) if err.is_canceled());
        Completion::new(
            self.key.clone(),
            CompletionKind::Fetch,
            self.elapsed,
            failed,
            canceled,
            Box::new(self),
        )
    }
}

/// A fetch that has been started but not yet driven.
///
/// Await it directly to get the typed [`FetchOutcome`], or turn it into a
/// loop message with [`FetchTask::into_completion`].
pub struct FetchTask<T> {
    key: String,
    future: BoxFuture<'static, FetchOutcome<T>>,
}

impl<T: Send + 'static> FetchTask<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Erase the payload type so the task can ride the event loop.
    pub fn into_completion(self) -> BoxFuture<'static, Completion> {
        self.future.map(FetchOutcome::into_completion).boxed()
    }
}

impl<T> Future for FetchTask<T> {
    type Output = FetchOutcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().future.as_mut().poll(cx)
    }
}

/// One cache entry plus the fetcher that refreshes it.
pub struct Pool<T> {
    key: String,
    config: PoolConfig,
    snapshot: Snapshot<T>,
    fetcher: Arc<dyn Fetcher<T>>,
    version: u64,
    generation: u64,
    /// Fetches started so far; the latest one carries this number.
    fetch_seq: u64,
    in_flight: bool,
    /// State and error to restore if the in-flight fetch is canceled.
    resume: (SnapshotState, Option<CamperError>),
}

impl<T: Send + Sync + 'static> Pool<T> {
    pub fn new(key: impl Into<String>, config: PoolConfig, fetcher: Arc<dyn Fetcher<T>>) -> Self {
        Self {
            key: key.into(),
            config,
            snapshot: Snapshot::default(),
            fetcher,
            version: 0,
            generation: next_generation(),
            fetch_seq: 0,
            in_flight: false,
            resume: (SnapshotState::Idle, None),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Bumped every time the data changes.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// True while a fetch started by this pool has not completed.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Current snapshot, with staleness computed against the wall clock.
    pub fn get(&self) -> Snapshot<T> {
        self.get_at(Utc::now())
    }

    /// Current snapshot as it looks at `now`.
    ///
    /// Fresh data older than `fresh_ttl` reads as stale. With a non-zero
    /// `stale_ttl`, data older than both TTLs combined reads as gone.
    pub fn get_at(&self, now: Timestamp) -> Snapshot<T> {
        let mut snap = self.snapshot.clone();
        if self.config.fresh_ttl.is_zero() || !snap.has_data() {
            return snap;
        }
        let Some(age) = snap.age_at(now) else {
            return snap;
        };
        if age < self.config.fresh_ttl {
            return snap;
        }
        if !self.config.stale_ttl.is_zero() && age >= self.config.fresh_ttl + self.config.stale_ttl {
            snap.data = None;
            snap.error = None;
            if snap.state != SnapshotState::Loading {
                snap.state = SnapshotState::Idle;
            }
        } else if snap.state == SnapshotState::Fresh {
            snap.state = SnapshotState::Stale;
        }
        snap
    }

    /// True if the data is fresh at `now`.
    pub fn is_fresh_at(&self, now: Timestamp) -> bool {
        self.get_at(now).fresh()
    }

    /// Install a value as if the server had just returned it.
    pub fn set(&mut self, value: T) {
        self.install(Arc::new(value), Utc::now());
    }

    /// Mark fresh data stale so the next [`Pool::fetch_if_stale`] refreshes it.
    pub fn invalidate(&mut self) {
        if self.snapshot.state == SnapshotState::Fresh {
            self.snapshot.state = SnapshotState::Stale;
            tracing::debug!(key = %self.key, "pool invalidated");
        }
    }

    /// Drop the data and forget any in-flight work.
    ///
    /// Completions started before the clear are discarded when they arrive.
    pub fn clear(&mut self) {
        self.snapshot = Snapshot::default();
        self.in_flight = false;
        self.resume = (SnapshotState::Idle, None);
        self.generation = next_generation();
        self.version += 1;
        tracing::debug!(key = %self.key, generation = self.generation, "pool cleared");
    }

    /// Start a refresh unless one is already running.
    ///
    /// Returns `None` when a fetch is in flight; the caller then waits for
    /// that fetch's notification instead.
    pub fn fetch(&mut self, ctx: &FetchContext) -> Option<FetchTask<T>> {
        if self.in_flight {
            tracing::trace!(key = %self.key, "fetch absorbed by in-flight request");
            return None;
        }
        self.in_flight = true;
        self.fetch_seq += 1;
        self.resume = (self.snapshot.state, self.snapshot.error.take());
        self.snapshot.state = SnapshotState::Loading;
        tracing::debug!(key = %self.key, generation = self.generation, "fetch started");

        let fetcher = Arc::clone(&self.fetcher);
        let ctx = ctx.clone();
        let key = self.key.clone();
        let generation = self.generation;
        let seq = self.fetch_seq;
        let future = async move {
            let started = Instant::now();
            let result = ctx.run(fetcher.fetch(&ctx)).await;
            FetchOutcome {
                key,
                generation,
                seq,
                elapsed: started.elapsed(),
                result,
            }
        }
        .boxed();

        Some(FetchTask {
            key: self.key.clone(),
            future,
        })
    }

    /// Start a refresh unless the data is fresh or a fetch is running.
    pub fn fetch_if_stale(&mut self, ctx: &FetchContext) -> Option<FetchTask<T>> {
        if self.is_fresh_at(Utc::now()) {
            return None;
        }
        self.fetch(ctx)
    }

    /// Apply a finished fetch.
    ///
    /// Returns the notification to forward to the screen, or `None` when the
    /// outcome is dropped: it belongs to an older generation, or it was canceled.
    pub fn complete_fetch(&mut self, outcome: FetchOutcome<T>) -> Option<CacheEvent> {
        self.complete_fetch_with(outcome, Arc::new)
    }

    /// Like [`Pool::complete_fetch`], passing fetched data through `reconcile`
    /// before it is installed.
    pub(crate) fn complete_fetch_with<F>(
        &mut self,
        outcome: FetchOutcome<T>,
        reconcile: F,
    ) -> Option<CacheEvent>
    where
        F: FnOnce(T) -> Arc<T>,
    {
        if outcome.generation != self.generation {
            tracing::debug!(
                key = %self.key,
                stale_generation = outcome.generation,
                generation = self.generation,
                "discarding fetch from older generation"
            );
            return None;
        }
        self.in_flight = false;

        match outcome.result {
            Ok(value) => {
                let data = reconcile(value);
                self.install(data, Utc::now());
                tracing::debug!(key = %self.key, elapsed_ms = outcome.elapsed.as_millis() as u64, "fetch complete");
                Some(self.updated())
            }
            Err(err) if err.is_canceled() => {
                let (state, error) = std::mem::replace(&mut self.resume, (SnapshotState::Idle, None));
                self.snapshot.state = state;
                self.snapshot.error = error;
                tracing::debug!(key = %self.key, "fetch canceled");
                None
            }
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "fetch failed");
                self.resume = (SnapshotState::Idle, None);
                self.snapshot.state = SnapshotState::Error;
                self.snapshot.error = Some(err);
                Some(self.updated())
            }
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Sequence number of the most recently started fetch.
    pub(crate) fn fetch_seq(&self) -> u64 {
        self.fetch_seq
    }

    /// Install shared data as fresh server state.
    pub(crate) fn set_shared(&mut self, data: Arc<T>) {
        self.install(data, Utc::now());
    }

    /// Swap the data without touching state or timestamps.
    pub(crate) fn replace_data(&mut self, data: Arc<T>) {
        self.snapshot.data = Some(data);
        self.version += 1;
    }

    pub(crate) fn updated(&self) -> CacheEvent {
        CacheEvent::PoolUpdated {
            key: self.key.clone(),
        }
    }

    fn install(&mut self, data: Arc<T>, now: Timestamp) {
        self.snapshot = Snapshot {
            data: Some(data),
            state: SnapshotState::Fresh,
            error: None,
            fetched_at: Some(now),
        };
        self.version += 1;
    }
}

// ============================================================================
// TESTS
// ============================================================================
