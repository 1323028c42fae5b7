//! Cache Handle
//!
//! Public entry point pairing a store with its optimizer.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cache::{CacheStats, CacheStore, ItemInfo, Value};
use crate::config::Options;
use crate::error::Result;
use crate::tasks::{OptimizeReport, Optimizer};

/// Thread-safe cache handle.
///
/// Clones share the same store and optimizer. The background sweep ends when
/// the last clone is dropped.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use priority_cache::{Cache, Options, Value};
///
/// let cache = Cache::new(Options::default().with_threshold_access_count(2));
/// cache.set("greeting", "hello", Duration::from_secs(60)).unwrap();
///
/// assert_eq!(cache.get("greeting"), Some(Value::from("hello")));
/// assert_eq!(cache.priority("greeting"), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Cache {
    store: Arc<CacheStore>,
    optimizer: Arc<Optimizer>,
}

impl Cache {
    /// Creates an empty cache. The optimizer is not started.
    pub fn new(options: Options) -> Self {
        let store = Arc::new(CacheStore::new(options));
        let optimizer = Arc::new(Optimizer::new(store.clone()));
        Self { store, optimizer }
    }

    pub fn options(&self) -> &Options {
        self.store.options()
    }

    /// Stores `value` under `key` for `ttl`.
    ///
    /// A zero `ttl` applies [`DEFAULT_EXPIRATION`](crate::config::DEFAULT_EXPIRATION).
    /// Fails with [`CacheError::UnsupportedKind`](crate::CacheError::UnsupportedKind)
    /// for functions and channels.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>, ttl: Duration) -> Result<()> {
        self.store.set(key, value, ttl)
    }

    /// Returns the value under `key`, counting one access on a hit.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(key)
    }

    /// Removes `key`; returns false if it was absent.
    pub fn del(&self, key: &str) -> bool {
        self.store.del(key)
    }

    pub fn list(&self) -> Vec<String> {
        self.store.list()
    }

    /// Estimated footprint of all items in bytes.
    pub fn size(&self) -> usize {
        self.store.size()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    /// Current priority of `key`, 0 if absent.
    pub fn priority(&self, key: &str) -> u8 {
        self.store.priority(key)
    }

    pub fn item(&self, key: &str) -> Option<ItemInfo> {
        self.store.item(key)
    }

    pub fn items(&self) -> Vec<ItemInfo> {
        self.store.items()
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    /// Runs one sweep now. Returns None if a sweep was already running.
    pub fn optimize(&self) -> Option<OptimizeReport> {
        self.optimizer.optimize()
    }

    /// Starts the background sweep every `interval`; see [`Optimizer::start`].
    pub fn start_optimizer(&self, interval: Duration) -> bool {
        self.optimizer.start(interval)
    }

    /// Stops the background sweep; see [`Optimizer::stop`].
    pub fn stop_optimizer(&self) -> Option<JoinHandle<()>> {
        self.optimizer.stop()
    }

    pub fn is_optimizer_running(&self) -> bool {
        self.optimizer.is_running()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(Options::default())
    }
}
