//! Priority Cache - An in-process key-value cache
//!
//! Items carry an expiration and access statistics. Instead of a fixed
//! LRU/LFU policy, a periodic optimizer scores every item, removes the ones
//! scoring zero and compacts the store under a byte budget, lowest score
//! first.

pub mod cache;
pub mod config;
pub mod error;
pub mod handle;
pub mod logging;
pub mod tasks;

pub use cache::{Footprint, Kind, Storable, Value};
pub use config::{Options, DEFAULT_EXPIRATION};
pub use error::{CacheError, Result};
pub use handle::Cache;
pub use tasks::OptimizeReport;
