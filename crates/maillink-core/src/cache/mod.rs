//! Short-lived cache of resolved Message-IDs.
//!
//! Entries expire lazily: a read older than the TTL is a miss, and the next
//! store for that key overwrites it. Nothing sweeps the map and there is no
//! size bound; the key space is bounded by what one session clicks on.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::clock::{Clock, SystemClock};

/// How long a resolved Message-ID is served from memory.
pub const DEFAULT_TTL: Duration = Duration::from_millis(120_000);

/// What a cached Message-ID was resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A single message, by Gmail message id.
    Message(String),
    /// The newest message of a thread, by Gmail thread id.
    ThreadLast(String),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(id) => write!(f, "msg:{id}"),
            Self::ThreadLast(id) => write!(f, "thread-last:{id}"),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    message_id: String,
    inserted_at: i64,
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from memory.
    pub hits: u64,
    /// Reads that found nothing, or only an expired entry.
    pub misses: u64,
    /// Entries held, expired ones included.
    pub entries: usize,
}

/// Canonical Message-ID cache with a fixed TTL.
///
/// The lock is only held for the map operation itself, never across an
/// await point.
pub struct LinkCache<C = SystemClock> {
    ttl_millis: i64,
    clock: C,
    entries: Mutex<HashMap<CacheKey, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LinkCache<SystemClock> {
    /// Creates a cache on the system clock with the default TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock, DEFAULT_TTL)
    }
}

impl Default for LinkCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LinkCache<C> {
    /// Creates a cache on `clock` with the given TTL.
    #[must_use]
    pub fn with_clock(clock: C, ttl: Duration) -> Self {
        Self {
            ttl_millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            clock,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached Message-ID if it is younger than the TTL.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let now = self.clock.now_millis();
        let found = self
            .lock()
            .get(key)
            .filter(|entry| now - entry.inserted_at < self.ttl_millis)
            .map(|entry| entry.message_id.clone());

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(%key, "link cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(%key, "link cache miss");
        }
        found
    }

    /// Stores a Message-ID stamped with the current time.
    pub fn insert(&self, key: CacheKey, message_id: impl Into<String>) {
        let entry = Entry {
            message_id: message_id.into(),
            inserted_at: self.clock.now_millis(),
        };
        self.lock().insert(key, entry);
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.lock().len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
