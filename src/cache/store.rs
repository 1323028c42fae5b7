//! Cache Store Module
//!
//! Main cache engine: a HashMap of items behind a single reader/writer lock,
//! with an incrementally maintained footprint total.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::cache::stats::StatsCounters;
use crate::cache::{priority, CacheStats, Expiry, Footprint, Item, ItemInfo, Value};
use crate::config::{Options, DEFAULT_EXPIRATION};
use crate::error::{CacheError, Result};

// == Store State ==
/// Everything guarded by the store lock.
#[derive(Debug, Default)]
struct Inner {
    items: HashMap<String, Item>,
    /// Sum of `Item::footprint` over `items`
    size: usize,
}

impl Inner {
    fn insert(&mut self, item: Item) {
        let added = item.footprint();
        let replaced = self
            .items
            .insert(item.key().to_string(), item)
            .map_or(0, |old| old.footprint());
        self.size = self.size + added - replaced;
    }

    fn remove(&mut self, key: &str) -> Option<Item> {
        let item = self.items.remove(key)?;
        self.size -= item.footprint();
        Some(item)
    }
}

// == Candidate ==
/// Optimizer's view of one item at scan time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub key: String,
    pub id: u64,
    pub priority: u8,
    pub expiry: Expiry,
}

/// Why the optimizer removes an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Eviction {
    /// Priority dropped to 0
    Expired,
    /// Size budget exceeded
    Compaction,
}

/// Held for the duration of a sweep; releases the store's sweep flag on drop.
pub(crate) struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// == Cache Store ==
/// Thread-safe item storage with priority bookkeeping.
#[derive(Debug)]
pub struct CacheStore {
    inner: RwLock<Inner>,
    options: Options,
    stats: StatsCounters,
    /// Set while a sweep runs, whichever optimizer started it
    sweeping: AtomicBool,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store using the given thresholds.
    pub fn new(options: Options) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            options,
            stats: StatsCounters::default(),
            sweeping: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    // == Set ==
    /// Stores a value under `key`, replacing any previous item.
    ///
    /// The item expires `ttl` from now; a zero `ttl` means
    /// [`DEFAULT_EXPIRATION`], not "never". Functions and channels are
    /// rejected and leave the store untouched.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>, ttl: Duration) -> Result<()> {
        let key = key.into();
        let value = value.into();

        let kind = value.kind();
        if !kind.is_supported() {
            warn!(key = %key, kind = %kind, "Rejected unsupported value kind");
            return Err(CacheError::UnsupportedKind { key, kind });
        }

        let now = Utc::now();
        let ttl = if ttl.is_zero() { DEFAULT_EXPIRATION } else { ttl };
        let item = Item::new(key, value, expiration_after(now, ttl));
        item.set_priority(priority(Some(&item), &self.options, now));

        trace!(key = %item.key(), priority = item.priority(), "Set item");

        self.inner.write().insert(item);
        Ok(())
    }

    // == Get ==
    /// Returns a clone of the value stored under `key`.
    ///
    /// A hit counts one access and stamps the access time. Only the shared
    /// lock is taken; the bookkeeping goes through the item's atomics.
    pub fn get(&self, key: &str) -> Option<Value> {
        let inner = self.inner.read();
        match inner.items.get(key) {
            Some(item) => {
                item.record_access(Utc::now());
                self.stats.record_hit();
                Some(item.value().clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes the item under `key`.
    ///
    /// Returns false if there was none.
    pub fn del(&self, key: &str) -> bool {
        let removed = self.inner.write().remove(key).is_some();
        if removed {
            trace!(key = %key, "Deleted item");
        }
        removed
    }

    // == List ==
    /// Returns all keys, in no particular order.
    pub fn list(&self) -> Vec<String> {
        self.inner.read().items.keys().cloned().collect()
    }

    // == Size ==
    /// Returns the estimated footprint of all items in bytes.
    pub fn size(&self) -> usize {
        self.inner.read().size
    }

    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().items.contains_key(key)
    }

    // == Priority ==
    /// Recomputes, caches and returns the priority of `key`.
    ///
    /// An absent key has priority 0.
    pub fn priority(&self, key: &str) -> u8 {
        let inner = self.inner.read();
        let item = inner.items.get(key);
        let priority = priority(item, &self.options, Utc::now());
        if let Some(item) = item {
            item.set_priority(priority);
        }
        priority
    }

    // == Introspection ==
    /// Returns a snapshot of the item under `key`, without counting an access.
    pub fn item(&self, key: &str) -> Option<ItemInfo> {
        self.inner.read().items.get(key).map(Item::info)
    }

    /// Returns snapshots of all items, in no particular order.
    pub fn items(&self) -> Vec<ItemInfo> {
        self.inner.read().items.values().map(Item::info).collect()
    }

    /// Removes every item.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.items.clear();
        inner.size = 0;
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read();
        self.stats.snapshot(inner.items.len(), inner.size)
    }

    // == Optimizer Support ==
    /// Claims the store for one sweep. Returns None if a sweep is already
    /// running.
    pub(crate) fn try_begin_sweep(&self) -> Option<SweepGuard<'_>> {
        self.sweeping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SweepGuard(&self.sweeping))
    }

    /// Recomputes every priority at `now`, refreshes the cached values and
    /// returns the items as candidates.
    pub(crate) fn candidates(&self, now: DateTime<Utc>) -> Vec<Candidate> {
        let inner = self.inner.read();
        inner
            .items
            .values()
            .map(|item| {
                let priority = priority(Some(item), &self.options, now);
                item.set_priority(priority);
                Candidate {
                    key: item.key().to_string(),
                    id: item.id(),
                    priority,
                    expiry: item.expiry(),
                }
            })
            .collect()
    }

    /// Removes the candidate's item if it is still the one that was scanned.
    ///
    /// Expired evictions are re-checked against the current priority, since a
    /// read after the scan may have lifted it. Returns the store size after
    /// the removal, or None if nothing was removed.
    pub(crate) fn evict(&self, candidate: &Candidate, reason: Eviction, now: DateTime<Utc>) -> Option<usize> {
        let mut inner = self.inner.write();

        let item = inner.items.get(&candidate.key)?;
        if item.id() != candidate.id {
            debug!(key = %candidate.key, "Item replaced since scan, not evicting");
            return None;
        }
        if reason == Eviction::Expired && priority(Some(item), &self.options, now) != 0 {
            debug!(key = %candidate.key, "Item regained priority since scan, not evicting");
            return None;
        }

        inner.remove(&candidate.key);
        match reason {
            Eviction::Expired => {
                self.stats.record_expired();
                debug!(key = %candidate.key, "optimizing delete");
            }
            Eviction::Compaction => {
                self.stats.record_compacted();
                debug!(key = %candidate.key, "compaction delete");
            }
        }
        Some(inner.size)
    }

    pub(crate) fn record_sweep(&self) {
        self.stats.record_sweep();
    }
}

/// Computes `now + ttl`; a TTL past the representable range never expires.
fn expiration_after(now: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
}
