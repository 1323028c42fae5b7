//! Cache Module
//!
//! Provides the in-memory store, its values and the priority computation the
//! optimizer evicts by.

mod footprint;
mod item;
mod priority;
mod stats;
mod store;
mod value;


// Re-export public types
pub use footprint::Footprint;
pub use item::{Item, ItemInfo};
pub use priority::{priority, rank, Expiry, EVICTABLE};
pub use stats::CacheStats;
pub use store::CacheStore;
pub use value::{Array, AsAny, Kind, Storable, Value};

pub(crate) use store::{Candidate, Eviction};
