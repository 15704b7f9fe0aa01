//! Pools created on demand per sub-key.
//!
//! Used for data that hangs off a parent record, such as the answers to
//! each check-in question: one pool per question, created the first time
//! the question is opened and torn down together.

use std::collections::HashMap;
use std::hash::Hash;

use crate::message::{CacheEvent, Completion, CompletionKind};
use crate::pool::{FetchOutcome, Pool};
use crate::registry::{open, ErasedPool};

type PoolFactory<K, T> = Box<dyn Fn(&K) -> Pool<T> + Send>;

/// A family of pools keyed by `K`, registered under one realm key.
pub struct KeyedPool<K, T> {
    key: String,
    pools: HashMap<K, Pool<T>>,
    factory: PoolFactory<K, T>,
}

impl<K, T> KeyedPool<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Send + Sync + 'static,
{
    /// `factory` builds the pool for a sub-key on first access. Each pool it
    /// returns must have a key distinct from its siblings.
    pub fn new<F>(key: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&K) -> Pool<T> + Send + 'static,
    {
        Self {
            key: key.into(),
            pools: HashMap::new(),
            factory: Box::new(factory),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The pool for `sub_key`, created on first use.
    pub fn get(&mut self, sub_key: &K) -> &mut Pool<T> {
        let Self { key, pools, factory } = self;
        pools.entry(sub_key.clone()).or_insert_with(|| {
            let pool = factory(sub_key);
            tracing::debug!(key = %key, pool = %pool.key(), "keyed pool created");
            pool
        })
    }

    pub fn has(&self, sub_key: &K) -> bool {
        self.pools.contains_key(sub_key)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Mark every sub-pool stale.
    pub fn invalidate(&mut self) {
        for pool in self.pools.values_mut() {
            pool.invalidate();
        }
    }

    /// Clear and drop every sub-pool.
    pub fn clear(&mut self) {
        for pool in self.pools.values_mut() {
            pool.clear();
        }
        self.pools.clear();
    }
}

impl<K, T> ErasedPool for KeyedPool<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Send + Sync + 'static,
{
    fn key(&self) -> &str {
        KeyedPool::key(self)
    }

    fn owns(&self, key: &str) -> bool {
        self.key == key || self.pools.values().any(|p| p.key() == key)
    }

    fn invalidate(&mut self) {
        KeyedPool::invalidate(self);
    }

    fn clear(&mut self) {
        KeyedPool::clear(self);
    }

    fn deliver(&mut self, completion: Completion) -> Option<CacheEvent> {
        if completion.kind() != CompletionKind::Fetch {
            return None;
        }
        let pool = self.pools.values_mut().find(|p| p.key() == completion.key())?;
        open::<FetchOutcome<T>>(completion).and_then(|o| pool.complete_fetch(o))
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
