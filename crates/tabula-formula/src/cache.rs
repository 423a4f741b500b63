//! Computed value cache
//!
//! Formatted formula results keyed by cell id, held in a bounded LRU. An entry
//! is only returned while it is younger than the cache TTL and was computed
//! under the column generation the caller presents, so recompiling a formula
//! makes every older entry for that column unreachable without a sweep.
//! Expired entries are swept on insert at most once per TTL period.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use tabula_core::CellId;

/// Default lifetime of a cached value (one hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default maximum number of cached values
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
struct CacheEntry {
    generation: u64,
    value: String,
    inserted_at: Instant,
}

/// Counters for cache effectiveness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because they outlived the TTL
    pub expired: u64,
    /// Entries dropped because their generation was stale
    pub stale: u64,
    /// Entries pushed out by the capacity limit
    pub evicted: u64,
}

#[derive(Debug)]
struct CacheInner {
    entries: LruCache<CellId, CacheEntry>,
    last_sweep: Instant,
    stats: CacheStats,
}

impl CacheInner {
    fn sweep(&mut self, ttl: Duration) {
        let expired: Vec<CellId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() > ttl)
            .map(|(cell, _)| *cell)
            .collect();
        for cell in &expired {
            self.entries.pop(cell);
        }
        self.last_sweep = Instant::now();
        self.stats.expired += expired.len() as u64;
    }
}

/// Shared, thread-safe value cache
///
/// Clones share the same entries.
#[derive(Debug, Clone)]
pub struct ValueCache {
    ttl: Duration,
    inner: Arc<Mutex<CacheInner>>,
}

impl Default for ValueCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueCache {
    /// Create a cache with the default TTL and capacity
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    /// Create a cache with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_limits(ttl, DEFAULT_CAPACITY)
    }

    /// Create a cache with a custom TTL and capacity (at least one entry)
    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            inner: Arc::new(Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                last_sweep: Instant::now(),
                stats: CacheStats::default(),
            })),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.lock().entries.cap().get()
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().expect("value cache mutex poisoned")
    }

    /// Look up a value computed under `generation`
    pub fn get(&self, cell: CellId, generation: u64) -> Option<String> {
        let mut inner = self.lock();
        let found = inner.entries.get(&cell).map(|entry| {
            (
                entry.inserted_at.elapsed() > self.ttl,
                entry.generation == generation,
                entry.value.clone(),
            )
        });
        let Some((expired, current, value)) = found else {
            inner.stats.misses += 1;
            return None;
        };

        if expired || !current {
            inner.entries.pop(&cell);
            if expired {
                inner.stats.expired += 1;
            } else {
                inner.stats.stale += 1;
            }
            inner.stats.misses += 1;
            return None;
        }

        inner.stats.hits += 1;
        Some(value)
    }

    /// Store a value, replacing any previous entry for the cell
    pub fn insert(&self, cell: CellId, generation: u64, value: impl Into<String>) {
        let ttl = self.ttl;
        let mut inner = self.lock();
        if inner.last_sweep.elapsed() > ttl {
            inner.sweep(ttl);
        }
        let entry = CacheEntry {
            generation,
            value: value.into(),
            inserted_at: Instant::now(),
        };
        if let Some((pushed_out, _)) = inner.entries.push(cell, entry) {
            if pushed_out != cell {
                inner.stats.evicted += 1;
            }
        }
    }

    /// Drop the entry for a cell, returning whether one existed
    pub fn invalidate(&self, cell: CellId) -> bool {
        self.lock().entries.pop(&cell).is_some()
    }

    /// Drop the entries for several cells
    pub fn invalidate_many<I: IntoIterator<Item = CellId>>(&self, cells: I) -> usize {
        let mut inner = self.lock();
        cells
            .into_iter()
            .filter(|cell| inner.entries.pop(cell).is_some())
            .count()
    }

    /// Number of live entries; expired ones are purged first
    pub fn len(&self) -> usize {
        let ttl = self.ttl;
        let mut inner = self.lock();
        inner.sweep(ttl);
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}
