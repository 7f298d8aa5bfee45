//! Query cache — time-boxed memoization of remote query results, partitioned
//! by network.
//!
//! Keys are (network, operation, canonicalized params), so entries written
//! under one network are invisible to reads issued under another even when
//! the remote surface computes identical identifiers on both chains. Values
//! are stored typed (no serialization round-trip), so a `get` right after an
//! `insert` returns the identical value.
//!
//! Capacity is bounded by entry count with least-recently-used eviction,
//! independent of TTL. The single internal lock is never held across an
//! await, so eviction cannot block a concurrent read for long.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::network::NetworkId;

/// Compound cache key. `params` is the JSON canonicalization of the
/// operation's parameters, so logically equal queries hit the same entry
/// regardless of how the caller built them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub network: NetworkId,
    pub operation: &'static str,
    pub params: String,
}

impl QueryKey {
    pub fn new(network: NetworkId, operation: &'static str, params: impl Serialize) -> Self {
        // Distinct param sets must never collapse onto one key, so a failed
        // canonicalization is a caller bug rather than a silent "".
        let params = match serde_json::to_string(&params) {
            Ok(params) => params,
            Err(e) => {
                debug_assert!(false, "cache key params failed to canonicalize: {}", e);
                format!("<uncanonicalizable:{}>", e)
            }
        };
        Self {
            network,
            operation,
            params,
        }
    }
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    written: Instant,
    ttl: Duration,
    last_used: u64,
}

struct CacheInner {
    entries: HashMap<QueryKey, CacheEntry>,
    /// Monotonic use counter backing the LRU order.
    tick: u64,
}

pub struct QueryCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                tick: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    /// Cached value for `key`, if present, fresh, and of the requested type.
    /// Expired entries are dropped on access.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<T> {
        let mut inner = self.lock();
        let fresh = match inner.entries.get(key) {
            Some(entry) => entry.written.elapsed() < entry.ttl,
            None => return None,
        };
        if !fresh {
            inner.entries.remove(key);
            return None;
        }

        inner.tick += 1;
        let tick = inner.tick;
        let entry = inner.entries.get_mut(key)?;
        entry.last_used = tick;
        entry
            .value
            .clone()
            .downcast::<T>()
            .ok()
            .map(|value| (*value).clone())
    }

    /// Store `value` under `key` with the given TTL, evicting the
    /// least-recently-used entry if the cache is at capacity.
    pub fn insert<T: Send + Sync + 'static>(&self, key: QueryKey, value: T, ttl: Duration) {
        let mut inner = self.lock();
        if inner.entries.len() >= self.capacity && !inner.entries.contains_key(&key) {
            if let Some(victim) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone())
            {
                tracing::debug!(operation = victim.operation, network = %victim.network, "Evicting LRU cache entry");
                inner.entries.remove(&victim);
            }
        }

        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.insert(
            key,
            CacheEntry {
                value: Arc::new(value),
                written: Instant::now(),
                ttl,
                last_used: tick,
            },
        );
    }

    /// Drop every entry belonging to `network` — used on manual cache clears.
    /// A network switch does not call this: the old partition simply stops
    /// being read.
    pub fn invalidate_network(&self, network: &NetworkId) {
        let mut inner = self.lock();
        inner.entries.retain(|key, _| key.network != *network);
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
