//! Logging Module
//!
//! The cache reports through `tracing` events (trace through error; critical
//! conditions are emitted as `error` with `critical = true`). With no
//! subscriber installed every event is discarded, so logging never changes
//! cache behavior.
//!
//! A process installs at most one sink: either the default stderr formatter
//! via [`init_default`] or its own subscriber via [`set_logger`].

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Subscriber;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "priority_cache=info";

/// Installs the default sink: formatted lines on stderr, filtered by
/// `RUST_LOG` or [`DEFAULT_FILTER`].
///
/// Fails if a global subscriber is already set.
pub fn init_default() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
}

/// Installs `subscriber` as the process-wide sink.
///
/// Fails if a global subscriber is already set.
pub fn set_logger<S>(subscriber: S) -> Result<(), SetGlobalDefaultError>
where
    S: Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::set_global_default(subscriber)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::cache::Value;
    use crate::Cache;

    fn exercise(cache: &Cache) -> (Option<Value>, bool, usize) {
        cache.set("a", "x", Duration::ZERO).unwrap();
        let rejected = cache
            .set("f", Value::object((|| 1) as fn() -> i32), Duration::ZERO)
            .is_err();
        cache.optimize();
        (cache.get("a"), rejected, cache.size())
    }

    #[test]
    fn test_sink_does_not_change_behavior() {
        let silent = exercise(&Cache::default());

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        let verbose =
            tracing::subscriber::with_default(subscriber, || exercise(&Cache::default()));

        assert_eq!(silent, verbose);
        assert!(silent.1);
    }
}
