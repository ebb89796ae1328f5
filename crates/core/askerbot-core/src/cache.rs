//! Time-bounded caches
//!
//! [`TtlCache`] memoizes values by string key for a fixed time-to-live and
//! holds at most `max_entries` values. When full, the oldest *inserted*
//! entry is evicted first; reads do not refresh an entry's position.
//!
//! Time comes from an injected [`Clock`] so expiry can be tested without
//! sleeping.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::trace;

/// Source of monotonic time for cache expiry
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.start + offset
    }
}

/// Hit/miss counters for one cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that returned a live value
    pub hits: u64,
    /// Lookups that found nothing or an expired value
    pub misses: u64,
    /// Entries dropped to respect the capacity
    pub evictions: u64,
    /// Entries dropped because their TTL ran out
    pub expirations: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    generation: u64,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    order: VecDeque<(String, u64)>,
    next_generation: u64,
    stats: CacheStats,
}

/// Thread-safe cache with a fixed TTL and strict insertion-order eviction
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache
    pub fn new(name: &'static str, ttl: Duration, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl,
            max_entries: max_entries.max(1),
            clock,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                next_generation: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a live value
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.lock();

        let expired = match inner.entries.get(key) {
            Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                let value = entry.value.clone();
                inner.stats.hits += 1;
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.remove(key);
            inner.stats.expirations += 1;
            trace!(cache = self.name, key, "expired entry dropped on read");
        }
        inner.stats.misses += 1;
        None
    }

    /// Store a value, replacing any previous value for the key
    ///
    /// A replaced key counts as a fresh insertion: it moves to the back of
    /// the eviction queue and its TTL restarts.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = self.clock.now();
        let mut inner = self.lock();

        let generation = inner.next_generation;
        inner.next_generation += 1;
        inner.entries.insert(
            key.clone(),
            Entry {
                value,
                inserted_at: now,
                generation,
            },
        );
        inner.order.push_back((key, generation));

        self.purge_expired(&mut inner, now);

        while inner.entries.len() > self.max_entries {
            let Some((oldest, generation)) = inner.order.pop_front() else {
                break;
            };
            let live = inner
                .entries
                .get(&oldest)
                .map(|e| e.generation == generation)
                .unwrap_or(false);
            if live {
                inner.entries.remove(&oldest);
                inner.stats.evictions += 1;
                trace!(cache = self.name, key = %oldest, "evicted oldest entry");
            }
        }

        // Replaced keys leave stale queue slots behind.
        if inner.order.len() > self.max_entries * 2 {
            let Inner { entries, order, .. } = &mut *inner;
            order.retain(|(k, g)| entries.get(k).map(|e| e.generation == *g).unwrap_or(false));
        }
    }

    fn purge_expired(&self, inner: &mut Inner<V>, now: Instant) {
        while let Some((key, generation)) = inner.order.front().cloned() {
            let state = inner
                .entries
                .get(&key)
                .map(|e| (e.generation == generation, now.duration_since(e.inserted_at) >= self.ttl));
            match state {
                Some((true, true)) => {
                    inner.order.pop_front();
                    inner.entries.remove(&key);
                    inner.stats.expirations += 1;
                }
                Some((true, false)) => break,
                _ => {
                    inner.order.pop_front();
                }
            }
        }
    }

    /// Remove a single key
    pub fn remove(&self, key: &str) -> Option<V> {
        self.lock().entries.remove(key).map(|e| e.value)
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of stored entries, live or not yet purged
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the hit/miss counters
    pub fn stats(&self) -> CacheStats {
        self.lock().stats.clone()
    }

    /// Cache name used in logs
    pub fn name(&self) -> &'static str {
        self.name
    }
}
