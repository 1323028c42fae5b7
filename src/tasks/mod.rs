//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - Optimizer: recomputes priorities, removes evictable items and compacts
//!   the store under its size budget

mod optimizer;

#[cfg(test)]
pub(crate) use optimizer::sweep;
pub use optimizer::{OptimizeReport, Optimizer};
