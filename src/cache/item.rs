//! Cache Item Module
//!
//! Defines the record stored under each key: the value plus its expiration,
//! cached priority and access statistics.

use std::mem::size_of;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{Expiry, Footprint, Kind, Value};

/// Sentinel for "never read".
const NEVER_ACCESSED: i64 = i64::MIN;

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

// == Item ==
/// A single stored key/value record plus its metadata.
///
/// Value, expiration and footprint are fixed at creation. Access statistics
/// are updated through atomics so that reads only need a shared lock on the
/// store.
#[derive(Debug)]
pub struct Item {
    /// Unique per insertion, distinguishes a replaced item from its successor
    id: u64,
    key: String,
    value: Value,
    /// Cached priority, refreshed by the optimizer
    priority: AtomicU8,
    /// None = never expires
    expiration: Option<DateTime<Utc>>,
    access_count: AtomicU64,
    /// Unix microseconds of the latest read
    last_access: AtomicI64,
    /// Bytes charged against the size budget, measured once at creation
    footprint: usize,
}

impl Item {
    // == Constructor ==
    /// Creates a new item with zero priority and no access history.
    pub fn new(key: impl Into<String>, value: Value, expiration: Option<DateTime<Utc>>) -> Self {
        let key = key.into();
        let footprint = key.footprint()
            + value.footprint()
            + size_of::<u8>()
            + expiration.footprint()
            + size_of::<u64>()
            + size_of::<Option<DateTime<Utc>>>();
        Self {
            id: NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed),
            key,
            value,
            priority: AtomicU8::new(0),
            expiration,
            access_count: AtomicU64::new(0),
            last_access: AtomicI64::new(NEVER_ACCESSED),
            footprint,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the cached priority as of the last refresh.
    pub fn priority(&self) -> u8 {
        self.priority.load(Ordering::Relaxed)
    }

    pub(crate) fn set_priority(&self, priority: u8) {
        self.priority.store(priority, Ordering::Relaxed);
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    pub fn expiry(&self) -> Expiry {
        Expiry::from(self.expiration)
    }

    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// Returns the time of the most recent successful read.
    pub fn last_access(&self) -> Option<DateTime<Utc>> {
        match self.last_access.load(Ordering::Relaxed) {
            NEVER_ACCESSED => None,
            micros => DateTime::from_timestamp_micros(micros),
        }
    }

    // == Record Access ==
    /// Counts one read at `now`.
    ///
    /// Concurrent readers may race on the timestamp; `fetch_max` keeps the
    /// latest one.
    pub fn record_access(&self, now: DateTime<Utc>) {
        self.access_count.fetch_add(1, Ordering::Relaxed);
        self.last_access
            .fetch_max(now.timestamp_micros(), Ordering::Relaxed);
    }

    // == Is Expired ==
    /// Returns true once `now` has reached the expiration time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Returns a serializable snapshot of the item's metadata.
    pub fn info(&self) -> ItemInfo {
        ItemInfo {
            key: self.key.clone(),
            kind: self.value.kind(),
            priority: self.priority(),
            expiration: self.expiration,
            access_count: self.access_count(),
            last_access: self.last_access(),
            footprint: self.footprint(),
        }
    }
}

// Opaque payloads may grow behind a shared `Arc` after insertion; the store
// must add and subtract the same amount, so the creation-time figure is used.
impl Footprint for Item {
    fn footprint(&self) -> usize {
        self.footprint
    }
}

// == Item Info ==
/// Read-only snapshot of an item, used for introspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemInfo {
    pub key: String,
    pub kind: Kind,
    pub priority: u8,
    pub expiration: Option<DateTime<Utc>>,
    pub access_count: u64,
    pub last_access: Option<DateTime<Utc>>,
    /// Estimated bytes charged against the size budget
    pub footprint: usize,
}
