//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::cache::Kind;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Lookups and deletions never fail; a miss is reported through `Option` or
/// `bool`. The only recoverable failure is an attempt to store a value whose
/// kind the cache refuses to hold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Value kind cannot be stored (functions, channels)
    #[error("type of value is not supported: key = {key}, kind = {kind}")]
    UnsupportedKind { key: String, kind: Kind },
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_kind_message() {
        let err = CacheError::UnsupportedKind {
            key: "f".to_string(),
            kind: Kind::Func,
        };
        assert_eq!(
            err.to_string(),
            "type of value is not supported: key = f, kind = func"
        );
    }
}
