//! Cache em memória com expiração por TTL.
//!
//! O [`CacheStore`] guarda valores já materializados sob uma chave de texto.
//! Cada entrada registra o instante de criação e o próprio TTL; a expiração é
//! detectada apenas no acesso (não há varredura em segundo plano). Todas as
//! operações passam por um único mutex que nunca é mantido durante I/O.
//!
//! Cada chave tem uma geração incrementada a cada invalidação. Um valor
//! buscado antes de uma invalidação é descartado por [`CacheStore::set_if_current`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::clock::{Clock, SystemClock};

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= self.ttl
    }
}

/// Invalidation counter for one key, read before a fetch and checked when
/// the fetched value is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    epoch: u64,
    key: u64,
}

struct Slots<V> {
    entries: HashMap<String, CacheEntry<V>>,
    // Bumped by `delete`, whether or not the key held a value.
    generations: HashMap<String, u64>,
    // Bumped by `clear`.
    epoch: u64,
}

impl<V> Slots<V> {
    fn generation(&self, key: &str) -> Generation {
        Generation {
            epoch: self.epoch,
            key: self.generations.get(key).copied().unwrap_or(0),
        }
    }
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub expired: usize,
    pub valid: usize,
}

/// Thread-safe TTL key/value cache.
pub struct CacheStore<V> {
    slots: Mutex<Slots<V>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> CacheStore<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Mutex::new(Slots {
                entries: HashMap::new(),
                generations: HashMap::new(),
                epoch: 0,
            }),
            clock,
        }
    }

    // A panic elsewhere cannot leave an entry half-written, so a poisoned
    // map is still consistent.
    fn lock(&self) -> MutexGuard<'_, Slots<V>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the value for `key` if it is younger than its TTL.
    ///
    /// An expired entry is removed as a side effect and reported as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.instant();
        let mut slots = self.lock();
        match slots.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                debug!(key, "cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                slots.entries.remove(key);
                debug!(key, "cache entry expired");
                None
            }
            None => {
                debug!(key, "cache miss");
                None
            }
        }
    }

    /// Stores `value` under `key`, replacing any previous entry and restarting its age.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let stored_at = self.clock.instant();
        debug!(key = %key, ttl_secs = ttl.as_secs_f64(), "cache updated");
        self.lock().entries.insert(
            key,
            CacheEntry {
                value,
                stored_at,
                ttl,
            },
        );
    }

    /// Current invalidation generation of `key`.
    pub fn generation(&self, key: &str) -> Generation {
        self.lock().generation(key)
    }

    /// Stores `value` only if `key` has not been deleted or cleared since
    /// `seen` was read. Returns whether the value was stored.
    pub fn set_if_current(&self, key: &str, seen: Generation, value: V, ttl: Duration) -> bool {
        let stored_at = self.clock.instant();
        let mut slots = self.lock();
        if slots.generation(key) != seen {
            debug!(key, "stale value not cached");
            return false;
        }
        debug!(key, ttl_secs = ttl.as_secs_f64(), "cache updated");
        slots.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at,
                ttl,
            },
        );
        true
    }

    /// Removes `key` if present. Missing keys are ignored, but values fetched
    /// before this call can no longer be stored with [`set_if_current`](Self::set_if_current).
    pub fn delete(&self, key: &str) {
        let mut slots = self.lock();
        *slots.generations.entry(key.to_string()).or_insert(0) += 1;
        if slots.entries.remove(key).is_some() {
            debug!(key, "cache entry invalidated");
        }
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut slots = self.lock();
        let dropped = slots.entries.len();
        slots.entries.clear();
        slots.epoch += 1;
        debug!(dropped, "cache cleared");
    }

    /// Counts entries, re-evaluating expiry without evicting anything.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.instant();
        let slots = self.lock();
        let total = slots.entries.len();
        let expired = slots.entries.values().filter(|e| e.is_expired(now)).count();
        CacheStats {
            total,
            expired,
            valid: total - expired,
        }
    }
}
