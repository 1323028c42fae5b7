//! Cache Value Module
//!
//! Stored payloads are a closed set of tagged variants. Opaque user data goes
//! through the [`Storable`] trait, which carries the footprint hook and a
//! [`Kind`] classification checked on insertion.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::Footprint;

// == Kind ==
/// Shape classification of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Bool,
    Char,
    Int,
    Uint,
    Float,
    String,
    Bytes,
    Array,
    Map,
    Struct,
    Func,
    Chan,
}

impl Kind {
    /// Returns false for kinds the cache refuses to hold.
    pub fn is_supported(self) -> bool {
        !matches!(self, Kind::Func | Kind::Chan)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Char => "char",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Struct => "struct",
            Kind::Func => "func",
            Kind::Chan => "chan",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Storable ==
#[doc(hidden)]
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Opaque payload that can be stored through [`Value::Object`].
///
/// Implementors get the shallow intrinsic footprint and the `Struct` kind by
/// default:
///
/// ```
/// use priority_cache::cache::{Footprint, Storable};
///
/// #[derive(Debug)]
/// struct Session {
///     user_id: u64,
/// }
///
/// impl Footprint for Session {}
/// impl Storable for Session {}
/// ```
pub trait Storable: AsAny + Footprint + Send + Sync + fmt::Debug {
    fn kind(&self) -> Kind {
        Kind::Struct
    }
}

impl dyn Storable {
    /// Returns the payload as `T` if that is its concrete type.
    pub fn downcast_ref<T: Storable>(&self) -> Option<&T> {
        AsAny::as_any(self).downcast_ref::<T>()
    }

    pub fn is<T: Storable>(&self) -> bool {
        AsAny::as_any(self).is::<T>()
    }
}

// Function pointers and channel handles are representable so that they can be
// refused by `set` with a typed error. std receivers are not `Sync` and cannot
// be wrapped at all.
macro_rules! func_storable {
    ($(($($arg:ident),*)),* $(,)?) => {
        $(
            impl<R: 'static, $($arg: 'static),*> Footprint for fn($($arg),*) -> R {}
            impl<R: 'static, $($arg: 'static),*> Storable for fn($($arg),*) -> R {
                fn kind(&self) -> Kind {
                    Kind::Func
                }
            }
        )*
    };
}

func_storable!((), (A), (A, B), (A, B, C));

macro_rules! chan_storable {
    ($($chan:ident)::+) => {
        impl<T: Send + 'static> Footprint for $($chan)::+<T> {}
        impl<T: Send + 'static> Storable for $($chan)::+<T> {
            fn kind(&self) -> Kind {
                Kind::Chan
            }
        }
    };
}

chan_storable!(std::sync::mpsc::Sender);
chan_storable!(std::sync::mpsc::SyncSender);
chan_storable!(tokio::sync::mpsc::Sender);
chan_storable!(tokio::sync::mpsc::UnboundedSender);
chan_storable!(tokio::sync::mpsc::Receiver);
chan_storable!(tokio::sync::mpsc::UnboundedReceiver);

// == Array ==
/// Homogeneous typed sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Bool(Vec<bool>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Str(Vec<String>),
}

macro_rules! array_dispatch {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            Array::Bool($v) => $body,
            Array::I16($v) => $body,
            Array::I32($v) => $body,
            Array::I64($v) => $body,
            Array::U16($v) => $body,
            Array::U32($v) => $body,
            Array::U64($v) => $body,
            Array::F32($v) => $body,
            Array::F64($v) => $body,
            Array::Str($v) => $body,
        }
    };
}

impl Array {
    pub fn len(&self) -> usize {
        array_dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Footprint for Array {
    fn footprint(&self) -> usize {
        array_dispatch!(self, v => v.footprint())
    }
}

// == Value ==
/// A value held by the cache.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Array),
    Map(BTreeMap<String, Value>),
    Object(Arc<dyn Storable>),
}

impl Value {
    /// Wraps an opaque payload.
    pub fn object<T: Storable>(payload: T) -> Self {
        Value::Object(Arc::new(payload))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Char(_) => Kind::Char,
            Value::I8(_) | Value::I16(_) | Value::I32(_) | Value::I64(_) => Kind::Int,
            Value::U8(_) | Value::U16(_) | Value::U32(_) | Value::U64(_) => Kind::Uint,
            Value::F32(_) | Value::F64(_) => Kind::Float,
            Value::Str(_) => Kind::String,
            Value::Bytes(_) => Kind::Bytes,
            Value::Array(_) => Kind::Array,
            Value::Map(_) => Kind::Map,
            Value::Object(obj) => obj.kind(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns any signed integer widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v.into()),
            Value::I16(v) => Some(v.into()),
            Value::I32(v) => Some(v.into()),
            Value::I64(v) => Some(v),
            _ => None,
        }
    }

    /// Returns any unsigned integer widened to `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U8(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v.into()),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns an opaque payload as `T` if that is its concrete type.
    pub fn downcast_ref<T: Storable>(&self) -> Option<&T> {
        match self {
            Value::Object(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl Footprint for Value {
    fn footprint(&self) -> usize {
        match self {
            Value::Bool(v) => v.footprint(),
            Value::Char(v) => v.footprint(),
            Value::I8(v) => v.footprint(),
            Value::I16(v) => v.footprint(),
            Value::I32(v) => v.footprint(),
            Value::I64(v) => v.footprint(),
            Value::U8(v) => v.footprint(),
            Value::U16(v) => v.footprint(),
            Value::U32(v) => v.footprint(),
            Value::U64(v) => v.footprint(),
            Value::F32(v) => v.footprint(),
            Value::F64(v) => v.footprint(),
            Value::Str(s) => s.footprint(),
            Value::Bytes(b) => b.footprint(),
            Value::Array(a) => a.footprint(),
            Value::Map(m) => m.footprint(),
            Value::Object(obj) => obj.footprint(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // opaque payloads are equal only when they are the same allocation
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// == Conversions ==
macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from!(
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Str,
    Vec<u8> => Bytes,
    Array => Array,
    BTreeMap<String, Value> => Map,
);

macro_rules! array_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for Value {
                fn from(v: Vec<$ty>) -> Self {
                    Value::Array(Array::$variant(v))
                }
            }
        )*
    };
}

array_from!(
    bool => Bool,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Str,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Value {
    fn from(v: [u8; N]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Arc<dyn Storable>> for Value {
    fn from(v: Arc<dyn Storable>) -> Self {
        Value::Object(v)
    }
}
