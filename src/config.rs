//! Configuration Module
//!
//! Options recognized by the cache, passed at construction.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Expiration applied when `set` is called with a zero TTL.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(60 * 60);

/// Cache options.
///
/// Every threshold defaults to zero, which disables it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Byte budget for the store; 0 = unlimited
    pub threshold_size: usize,
    /// Recency window that earns a priority point; 0 = ignored
    pub threshold_access: Duration,
    /// Read count that earns a priority point; 0 = ignored
    pub threshold_access_count: u64,
}

impl Options {
    /// Creates Options by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_THRESHOLD_SIZE` - Byte budget (default: 0)
    /// - `CACHE_THRESHOLD_ACCESS_MS` - Recency window in milliseconds (default: 0)
    /// - `CACHE_THRESHOLD_ACCESS_COUNT` - Read count threshold (default: 0)
    ///
    /// Unparsable values fall back to the default.
    pub fn from_env() -> Self {
        Self {
            threshold_size: env::var("CACHE_THRESHOLD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            threshold_access: env::var("CACHE_THRESHOLD_ACCESS_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::ZERO),
            threshold_access_count: env::var("CACHE_THRESHOLD_ACCESS_COUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        }
    }

    pub fn with_threshold_size(mut self, bytes: usize) -> Self {
        self.threshold_size = bytes;
        self
    }

    pub fn with_threshold_access(mut self, window: Duration) -> Self {
        self.threshold_access = window;
        self
    }

    pub fn with_threshold_access_count(mut self, count: u64) -> Self {
        self.threshold_access_count = count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = Options::default();
        assert_eq!(options.threshold_size, 0);
        assert_eq!(options.threshold_access, Duration::ZERO);
        assert_eq!(options.threshold_access_count, 0);
    }

    #[test]
    fn test_options_builders() {
        let options = Options::default()
            .with_threshold_size(1024)
            .with_threshold_access(Duration::from_secs(10))
            .with_threshold_access_count(2);
        assert_eq!(options.threshold_size, 1024);
        assert_eq!(options.threshold_access, Duration::from_secs(10));
        assert_eq!(options.threshold_access_count, 2);
    }

    #[test]
    fn test_options_from_env() {
        env::set_var("CACHE_THRESHOLD_SIZE", "4096");
        env::set_var("CACHE_THRESHOLD_ACCESS_MS", "1500");
        env::set_var("CACHE_THRESHOLD_ACCESS_COUNT", "not-a-number");

        let options = Options::from_env();
        assert_eq!(options.threshold_size, 4096);
        assert_eq!(options.threshold_access, Duration::from_millis(1500));
        assert_eq!(options.threshold_access_count, 0);

        env::remove_var("CACHE_THRESHOLD_SIZE");
        env::remove_var("CACHE_THRESHOLD_ACCESS_MS");
        env::remove_var("CACHE_THRESHOLD_ACCESS_COUNT");
    }

    #[test]
    fn test_options_deserialize_partial() {
        let options: Options =
            serde_json::from_str(r#"{"threshold_access_count": 2}"#).unwrap();
        assert_eq!(options, Options::default().with_threshold_access_count(2));
    }

    #[test]
    fn test_default_expiration_is_one_hour() {
        assert_eq!(DEFAULT_EXPIRATION, Duration::from_secs(3600));
    }
}
