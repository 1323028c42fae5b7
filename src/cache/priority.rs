//! Priority Module
//!
//! Derives an item's eviction resistance from its expiration and access
//! metadata. Every satisfied condition adds one point:
//!
//! 1. the item never expires
//! 2. the item expires strictly after `now`
//! 3. access recency is configured and the last read lies inside the window
//! 4. access frequency is configured and the read count reached the threshold
//!
//! Rules 1 and 2 exclude each other. Priority 0 marks an item as evictable
//! regardless of size pressure.

use std::cmp::Ordering;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::cache::Item;
use crate::config::Options;

/// Priority of an item the optimizer removes unconditionally.
pub const EVICTABLE: u8 = 0;

// == Priority ==
/// Computes the priority of `item` against the configured thresholds.
///
/// Pure: neither the item nor its cached priority is touched. An absent item
/// has priority 0.
pub fn priority(item: Option<&Item>, options: &Options, now: DateTime<Utc>) -> u8 {
    let Some(item) = item else {
        return EVICTABLE;
    };

    let mut priority = EVICTABLE;

    match item.expiration() {
        None => priority += 1,
        Some(expires) if expires > now => priority += 1,
        Some(_) => {}
    }

    if !options.threshold_access.is_zero() {
        if let Some(last) = item.last_access() {
            // a window too large for chrono never closes
            let window = TimeDelta::from_std(options.threshold_access).unwrap_or(TimeDelta::MAX);
            let open = last
                .checked_add_signed(window)
                .map_or(true, |until| until > now);
            if last < now && open {
                priority += 1;
            }
        }
    }

    if options.threshold_access_count != 0
        && item.access_count() >= options.threshold_access_count
    {
        priority += 1;
    }

    priority
}

// == Expiry ==
/// Expiration as a totally ordered value.
///
/// `Never` ranks above every timestamp, so among items of equal priority one
/// without expiration outlives one that expires. Two `Never` values are
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Expiry {
    At(DateTime<Utc>),
    Never,
}

impl From<Option<DateTime<Utc>>> for Expiry {
    fn from(expiration: Option<DateTime<Utc>>) -> Self {
        match expiration {
            Some(at) => Expiry::At(at),
            None => Expiry::Never,
        }
    }
}

// == Rank ==
/// Orders two `(priority, expiry)` pairs, greater meaning more worth keeping.
///
/// Priority decides first; ties go to the later expiry.
pub fn rank(a: (u8, Expiry), b: (u8, Expiry)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1))
}
