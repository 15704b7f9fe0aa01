//! Realms: owned registries of pools with a shared lifetime.
//!
//! A realm holds every pool created for one scope (the whole session, one
//! account, one project) plus a cancellation context. Pools are created on
//! first use and live until [`Realm::teardown`], which cancels everything
//! still in flight under the realm's context and clears every pool.

use std::any::Any;
use std::collections::HashMap;

use camper_core::{CacheError, CamperResult};

use crate::fetcher::FetchContext;
use crate::message::{CacheEvent, Completion, CompletionKind};
use crate::mutation::{MutatingPool, MutationOutcome};
use crate::pool::{FetchOutcome, Pool};

/// Type-erased view of a pool, as stored in a [`Realm`].
pub trait ErasedPool: Any + Send {
    fn key(&self) -> &str;

    /// True if completions addressed to `key` belong to this pool.
    fn owns(&self, key: &str) -> bool {
        self.key() == key
    }

    fn invalidate(&mut self);

    fn clear(&mut self);

    /// Open a completion produced by this pool and apply it.
    fn deliver(&mut self, completion: Completion) -> Option<CacheEvent>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Open a completion payload as the concrete outcome type.
pub(crate) fn open<O: 'static>(completion: Completion) -> Option<O> {
    let key = completion.key().to_string();
    match completion.into_payload().downcast::<O>() {
        Ok(outcome) => Some(*outcome),
        Err(_) => {
            tracing::warn!(key = %key, "completion payload does not match pool type");
            None
        }
    }
}

impl<T: Send + Sync + 'static> ErasedPool for Pool<T> {
    fn key(&self) -> &str {
        Pool::key(self)
    }

    fn invalidate(&mut self) {
        Pool::invalidate(self);
    }

    fn clear(&mut self) {
        Pool::clear(self);
    }

    fn deliver(&mut self, completion: Completion) -> Option<CacheEvent> {
        match completion.kind() {
            CompletionKind::Fetch => open::<FetchOutcome<T>>(completion).and_then(|o| self.complete_fetch(o)),
            CompletionKind::Mutation => {
                tracing::warn!(key = %completion.key(), "mutation completion delivered to read-only pool");
                None
            }
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T: Send + Sync + 'static> ErasedPool for MutatingPool<T> {
    fn key(&self) -> &str {
        MutatingPool::key(self)
    }

    fn invalidate(&mut self) {
        MutatingPool::invalidate(self);
    }

    fn clear(&mut self) {
        MutatingPool::clear(self);
    }

    fn deliver(&mut self, completion: Completion) -> Option<CacheEvent> {
        match completion.kind() {
            CompletionKind::Fetch => open::<FetchOutcome<T>>(completion).and_then(|o| self.complete_fetch(o)),
            CompletionKind::Mutation => {
                open::<MutationOutcome<T>>(completion).and_then(|o| self.complete_mutation(o))
            }
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Named registry of pools sharing one cancellation context.
pub struct Realm {
    name: String,
    ctx: FetchContext,
    pools: HashMap<String, Box<dyn ErasedPool>>,
}

impl Realm {
    /// A realm whose context is only canceled by its own teardown.
    pub fn root(name: impl Into<String>) -> Self {
        Self::with_context(name, FetchContext::new())
    }

    /// A realm whose context is a child of `parent`.
    pub fn new(name: impl Into<String>, parent: &FetchContext) -> Self {
        Self::with_context(name, parent.child())
    }

    fn with_context(name: impl Into<String>, ctx: FetchContext) -> Self {
        let name = name.into();
        tracing::debug!(realm = %name, "realm created");
        Self {
            name,
            ctx,
            pools: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Context for work started on behalf of this realm's pools.
    pub fn context(&self) -> &FetchContext {
        &self.ctx
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pools.contains_key(key)
    }

    /// Get the pool under `key`, creating it with `create` on first use.
    ///
    /// Fails with [`CacheError::TypeMismatch`] when `key` already holds a
    /// pool of a different type.
    pub fn pool<P, F>(&mut self, key: &str, create: F) -> CamperResult<&mut P>
    where
        P: ErasedPool,
        F: FnOnce() -> P,
    {
        let entry = self
            .pools
            .entry(key.to_string())
            .or_insert_with(|| Box::new(create()) as Box<dyn ErasedPool>);
        entry.as_any_mut().downcast_mut::<P>().ok_or_else(|| {
            CacheError::TypeMismatch {
                key: key.to_string(),
            }
            .into()
        })
    }

    /// Get an existing pool.
    pub fn existing<P: ErasedPool>(&mut self, key: &str) -> CamperResult<&mut P> {
        let entry = self.pools.get_mut(key).ok_or_else(|| CacheError::UnknownPool {
            key: key.to_string(),
        })?;
        entry.as_any_mut().downcast_mut::<P>().ok_or_else(|| {
            CacheError::TypeMismatch {
                key: key.to_string(),
            }
            .into()
        })
    }

    /// Route a completion to the pool that owns it.
    ///
    /// Hands the completion back when no pool in this realm owns it.
    pub fn deliver(&mut self, completion: Completion) -> Result<Option<CacheEvent>, Completion> {
        let key = completion.key().to_string();
        if let Some(pool) = self.pools.get_mut(&key) {
            return Ok(pool.deliver(completion));
        }
        match self.pools.values_mut().find(|p| p.owns(&key)) {
            Some(pool) => Ok(pool.deliver(completion)),
            None => Err(completion),
        }
    }

    /// Mark every pool stale.
    pub fn invalidate(&mut self) {
        for pool in self.pools.values_mut() {
            pool.invalidate();
        }
    }

    /// Cancel in-flight work and drop every pool.
    pub fn teardown(&mut self) {
        self.ctx.cancel();
        for pool in self.pools.values_mut() {
            pool.clear();
        }
        let count = self.pools.len();
        self.pools.clear();
        tracing::debug!(realm = %self.name, pools = count, "realm torn down");
    }
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.pools.keys().collect();
        keys.sort();
        f.debug_struct("Realm")
            .field("name", &self.name)
            .field("pools", &keys)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
