//! Optimizer Task
//!
//! Periodic sweep that recomputes priorities, removes evictable items and
//! compacts the store under its size budget.
//!
//! A sweep that is requested while another one is still in progress on the
//! same store is skipped, not queued. Stop and tick are observed by the same
//! loop, so a stop never lands in the middle of a sweep. Background sweeps
//! run on Tokio's blocking pool.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::cache::{rank, CacheStore, Eviction, EVICTABLE};

// == Optimize Report ==
/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptimizeReport {
    /// Items removed because their priority was 0
    pub expired: usize,
    /// Items removed to meet the size budget
    pub compacted: usize,
    pub items_before: usize,
    pub items_after: usize,
    pub size_before: usize,
    pub size_after: usize,
}

impl OptimizeReport {
    pub fn removed(&self) -> usize {
        self.expired + self.compacted
    }
}

// == Sweep ==
/// Runs one optimization pass over `store`.
///
/// 1. every priority is recomputed; items at 0 are removed
/// 2. the rest are ranked by priority, ties going to the later expiration
/// 3. while the size budget is exceeded, the lowest-ranked item is removed
///
/// Each removal takes the store's write lock on its own. Callers hold the
/// store's sweep guard.
pub(crate) fn sweep(store: &CacheStore) -> OptimizeReport {
    let now = Utc::now();
    let mut report = OptimizeReport {
        items_before: store.len(),
        size_before: store.size(),
        ..OptimizeReport::default()
    };
    debug!(
        items = report.items_before,
        size = report.size_before,
        "before optimizing"
    );

    let (evictable, mut ranked): (Vec<_>, Vec<_>) = store
        .candidates(now)
        .into_iter()
        .partition(|candidate| candidate.priority == EVICTABLE);

    for candidate in &evictable {
        if store.evict(candidate, Eviction::Expired, now).is_some() {
            report.expired += 1;
        }
    }

    // highest first
    ranked.sort_by(|a, b| rank((b.priority, b.expiry), (a.priority, a.expiry)));

    let budget = store.options().threshold_size;
    if budget > 0 && store.size() > budget {
        for candidate in ranked.iter().rev() {
            if store.evict(candidate, Eviction::Compaction, now).is_some() {
                report.compacted += 1;
            }
            if store.size() <= budget {
                break;
            }
        }
        if store.size() > budget {
            warn!(size = store.size(), budget, "size budget still exceeded after compaction");
        }
    }

    report.items_after = store.len();
    report.size_after = store.size();
    store.record_sweep();

    debug!(
        items = report.items_after,
        size = report.size_after,
        "after optimizing"
    );
    report
}

/// Sweeps unless a sweep of `store` is already in progress.
fn try_sweep(store: &CacheStore) -> Option<OptimizeReport> {
    let _guard = store.try_begin_sweep()?;
    Some(sweep(store))
}

/// Handle of the spawned sweep task.
struct Running {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

// == Optimizer ==
/// Owns the lifecycle of the background sweep for one store.
///
/// Dropping the optimizer drops the stop sender, which ends the task too.
pub struct Optimizer {
    store: Arc<CacheStore>,
    running: Mutex<Option<Running>>,
}

impl Optimizer {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            running: Mutex::new(None),
        }
    }

    // == Optimize ==
    /// Sweeps now on the calling thread.
    ///
    /// Returns None if a sweep was already in progress.
    pub fn optimize(&self) -> Option<OptimizeReport> {
        let report = try_sweep(&self.store);
        if report.is_none() {
            debug!("sweep already in progress, skipped");
        }
        report
    }

    // == Start ==
    /// Spawns the periodic sweep on the current Tokio runtime.
    ///
    /// The first sweep runs one `interval` after the call. Returns false,
    /// without spawning, if the task is already running, `interval` is zero or
    /// too large for the timer, or no runtime is available.
    pub fn start(&self, interval: Duration) -> bool {
        if interval.is_zero() || Instant::now().checked_add(interval).is_none() {
            warn!(interval = ?interval, "optimizer interval out of range");
            return false;
        }

        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("optimizer already running");
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "cannot start optimizer outside a Tokio runtime");
                return false;
            }
        };

        let (stop, stop_rx) = oneshot::channel();
        let handle = runtime.spawn(run(self.store.clone(), interval, stop_rx));
        *running = Some(Running { stop, handle });
        true
    }

    // == Stop ==
    /// Signals the background task to end.
    ///
    /// Returns its handle so callers can await termination, or None if no
    /// task was running. No sweep starts after the task observes the signal.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let Running { stop, handle } = self.running.lock().take()?;
        // the task may already be gone
        let _ = stop.send(());
        Some(handle)
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }
}

impl fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Optimizer")
            .field("store", &self.store)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Sweep loop: waits for either the next tick or the stop signal.
async fn run(store: Arc<CacheStore>, interval: Duration, mut stop: oneshot::Receiver<()>) {
    info!(interval_ms = interval.as_millis() as u64, "Starting optimizer");

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            // Ok = explicit stop, Err = optimizer dropped
            _ = &mut stop => break,
            _ = ticker.tick() => {
                let store = store.clone();
                match tokio::task::spawn_blocking(move || try_sweep(&store)).await {
                    Ok(Some(report)) if report.removed() > 0 => info!(
                        expired = report.expired,
                        compacted = report.compacted,
                        size = report.size_after,
                        "Optimizer removed items"
                    ),
                    Ok(Some(_)) => debug!("Optimizer: nothing to remove"),
                    Ok(None) => debug!("previous sweep still running, tick skipped"),
                    Err(e) => error!(critical = true, error = %e, "Optimizer sweep failed"),
                }
            }
        }
    }

    info!("Optimizer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Value;
    use crate::config::Options;

    const TTL: Duration = Duration::from_secs(3600);

    fn store(options: Options) -> Arc<CacheStore> {
        Arc::new(CacheStore::new(options))
    }

    #[test]
    fn test_sweep_removes_expired_items() {
        let store = store(Options::default());
        store.set("expire_soon", "value", Duration::from_millis(1)).unwrap();
        store.set("long_lived", "value", TTL).unwrap();
        std::thread::sleep(Duration::from_millis(10));

        let report = sweep(&store);

        assert_eq!(report.expired, 1);
        assert_eq!(report.compacted, 0);
        assert_eq!(report.items_before, 2);
        assert_eq!(report.items_after, 1);
        assert!(store.get("expire_soon").is_none());
        assert!(store.get("long_lived").is_some());
        assert_eq!(store.stats().expired, 1);
        assert_eq!(store.stats().sweeps, 1);
    }

    #[test]
    fn test_sweep_refreshes_priorities() {
        let store = store(Options::default().with_threshold_access_count(2));
        store.set("a", "x", Duration::ZERO).unwrap();
        store.get("a");
        store.get("a");
        assert_eq!(store.item("a").unwrap().priority, 1);

        sweep(&store);
        assert_eq!(store.item("a").unwrap().priority, 2);
    }

    #[test]
    fn test_sweep_compacts_lowest_priority_first() {
        let sample = Arc::new(CacheStore::new(Options::default()));
        sample.set("k0", vec![0u8; 100], TTL).unwrap();
        let per_item = sample.size();

        // room for two items
        let store = store(
            Options::default()
                .with_threshold_size(per_item * 2)
                .with_threshold_access_count(1),
        );
        for key in ["k0", "k1", "k2", "k3"] {
            store.set(key, vec![0u8; 100], TTL).unwrap();
        }
        store.get("k1");
        store.get("k3");

        let report = sweep(&store);

        assert_eq!(report.compacted, 2);
        assert!(store.size() <= per_item * 2);
        let mut survivors = store.list();
        survivors.sort();
        assert_eq!(survivors, vec!["k1".to_string(), "k3".to_string()]);
    }

    #[test]
    fn test_sweep_tie_broken_by_later_expiration() {
        let sample = CacheStore::new(Options::default());
        sample.set("a", "0123456789", TTL).unwrap();
        let per_item = sample.size();

        let store = store(Options::default().with_threshold_size(per_item));
        store.set("a", "0123456789", Duration::from_secs(60)).unwrap();
        store.set("b", "0123456789", Duration::from_secs(7200)).unwrap();

        sweep(&store);

        assert_eq!(store.list(), vec!["b".to_string()]);
    }

    #[test]
    fn test_sweep_without_budget_keeps_everything_live() {
        let store = store(Options::default());
        for i in 0..50 {
            store.set(format!("key{}", i), vec![0u8; 1024], TTL).unwrap();
        }
        let report = sweep(&store);
        assert_eq!(report.removed(), 0);
        assert_eq!(store.len(), 50);
    }

    #[test]
    fn test_overlapping_sweep_is_skipped() {
        let optimizer = Optimizer::new(store(Options::default()));

        let guard = optimizer.store.try_begin_sweep().unwrap();
        assert!(optimizer.optimize().is_none());
        assert!(try_sweep(&optimizer.store).is_none());
        drop(guard);

        assert!(optimizer.optimize().is_some());
        assert_eq!(optimizer.store.stats().sweeps, 1);
    }

    #[test]
    fn test_optimizers_sharing_a_store_never_overlap() {
        let store = store(Options::default());
        let first = Optimizer::new(store.clone());
        let second = Optimizer::new(store.clone());

        let guard = store.try_begin_sweep().unwrap();
        assert!(first.optimize().is_none());
        assert!(second.optimize().is_none());
        drop(guard);

        assert!(second.optimize().is_some());
        assert_eq!(store.stats().sweeps, 1);
    }

    #[tokio::test]
    async fn test_background_sweep_waits_for_manual_sweep() {
        let store = store(Options::default());
        store.set("expire_soon", "value", Duration::from_millis(1)).unwrap();
        let optimizer = Optimizer::new(store.clone());

        let guard = store.try_begin_sweep().unwrap();
        assert!(optimizer.start(Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.stats().sweeps, 0);
        assert!(store.contains("expire_soon"));

        drop(guard);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.stats().sweeps > 0);
        assert!(!store.contains("expire_soon"));

        optimizer.stop().unwrap().await.unwrap();
    }

    #[test]
    fn test_optimizer_debug() {
        let optimizer = Optimizer::new(store(Options::default()));
        let debug = format!("{:?}", optimizer);
        assert!(debug.starts_with("Optimizer"));
        assert!(debug.contains("running: false"));
    }

    #[test]
    fn test_start_outside_runtime_is_refused() {
        let optimizer = Optimizer::new(store(Options::default()));
        assert!(!optimizer.start(Duration::from_millis(10)));
        assert!(!optimizer.is_running());
        assert!(optimizer.stop().is_none());
    }

    #[tokio::test]
    async fn test_start_rejects_zero_interval() {
        let optimizer = Optimizer::new(store(Options::default()));
        assert!(!optimizer.start(Duration::ZERO));
        assert!(!optimizer.is_running());
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let optimizer = Optimizer::new(store(Options::default()));

        assert!(optimizer.start(Duration::from_millis(50)));
        assert!(!optimizer.start(Duration::from_millis(10)));
        assert!(optimizer.is_running());

        let handle = optimizer.stop().unwrap();
        handle.await.unwrap();
        assert!(!optimizer.is_running());
        assert!(optimizer.stop().is_none());
    }

    #[tokio::test]
    async fn test_background_sweep_removes_expired_entries() {
        let store = store(Options::default());
        store.set("expire_soon", "value", Duration::from_millis(1)).unwrap();
        store.set("long_lived", "value", TTL).unwrap();

        let optimizer = Optimizer::new(store.clone());
        assert!(optimizer.start(Duration::from_millis(20)));

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(store.get("expire_soon").is_none(), "Expired entry should have been removed");
        assert_eq!(store.get("long_lived"), Some(Value::from("value")));

        optimizer.stop().unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_no_sweeps_after_stop() {
        let store = store(Options::default());
        let optimizer = Optimizer::new(store.clone());
        assert!(optimizer.start(Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(50)).await;

        optimizer.stop().unwrap().await.unwrap();
        let sweeps = store.stats().sweeps;
        assert!(sweeps > 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.stats().sweeps, sweeps);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let optimizer = Optimizer::new(store(Options::default()));
        assert!(optimizer.start(Duration::from_millis(10)));
        optimizer.stop().unwrap().await.unwrap();

        assert!(optimizer.start(Duration::from_millis(10)));
        assert!(optimizer.is_running());
        optimizer.stop().unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_ends_task() {
        let optimizer = Optimizer::new(store(Options::default()));
        assert!(optimizer.start(Duration::from_millis(10)));
        let Running { handle, stop } = optimizer.running.lock().take().unwrap();

        drop(stop);
        drop(optimizer);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task should end once the stop sender is gone")
            .unwrap();
    }
}
