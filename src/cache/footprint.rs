//! Footprint Estimation Module
//!
//! Heuristic byte-size estimates for stored values. The numbers feed the
//! size budget of the optimizer only; they are not exact memory accounting.
//!
//! - sequences and maps: `size_of::<element>() * len` (no header or bucket
//!   overhead)
//! - strings: length in bytes
//! - `&T`, `Box<T>`, `Arc<T>`: one level of indirection is followed
//! - anything else: the intrinsic size of the value, which for structs is the
//!   shallow top-level footprint

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::mem::size_of;
use std::sync::Arc;

use chrono::{DateTime, TimeZone};

// == Footprint Trait ==
/// Estimates the in-memory footprint of a value in bytes.
///
/// The default implementation returns the intrinsic size of the value, so a
/// plain data type only needs an empty `impl Footprint for MyType {}`.
pub trait Footprint {
    /// Returns the estimated footprint in bytes.
    fn footprint(&self) -> usize {
        std::mem::size_of_val(self)
    }
}

macro_rules! intrinsic_footprint {
    ($($ty:ty),* $(,)?) => {
        $(impl Footprint for $ty {})*
    };
}

intrinsic_footprint!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    std::time::Duration,
    std::time::Instant,
    std::time::SystemTime,
);

impl<Tz: TimeZone> Footprint for DateTime<Tz> {}

impl<T> Footprint for Option<T> {}

// == Strings ==
impl Footprint for str {
    fn footprint(&self) -> usize {
        self.len()
    }
}

impl Footprint for String {
    fn footprint(&self) -> usize {
        self.len()
    }
}

// == Sequences ==
impl<T> Footprint for [T] {
    fn footprint(&self) -> usize {
        size_of::<T>() * self.len()
    }
}

impl<T, const N: usize> Footprint for [T; N] {
    fn footprint(&self) -> usize {
        size_of::<T>() * N
    }
}

impl<T> Footprint for Vec<T> {
    fn footprint(&self) -> usize {
        self.as_slice().footprint()
    }
}

impl<T> Footprint for VecDeque<T> {
    fn footprint(&self) -> usize {
        size_of::<T>() * self.len()
    }
}

impl<T, S> Footprint for HashSet<T, S> {
    fn footprint(&self) -> usize {
        size_of::<T>() * self.len()
    }
}

impl<T> Footprint for BTreeSet<T> {
    fn footprint(&self) -> usize {
        size_of::<T>() * self.len()
    }
}

// == Maps ==
// Only the value type counts as the element, keys are not charged.
impl<K, V, S> Footprint for HashMap<K, V, S> {
    fn footprint(&self) -> usize {
        size_of::<V>() * self.len()
    }
}

impl<K, V> Footprint for BTreeMap<K, V> {
    fn footprint(&self) -> usize {
        size_of::<V>() * self.len()
    }
}

// == Indirection ==
impl<T: Footprint + ?Sized> Footprint for &T {
    fn footprint(&self) -> usize {
        (**self).footprint()
    }
}

impl<T: Footprint + ?Sized> Footprint for Box<T> {
    fn footprint(&self) -> usize {
        (**self).footprint()
    }
}

impl<T: Footprint + ?Sized> Footprint for Arc<T> {
    fn footprint(&self) -> usize {
        (**self).footprint()
    }
}
