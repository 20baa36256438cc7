//! Tracing setup for hosts of the engine.
//!
//! The engine only emits events; whoever embeds it decides where they go.
//! Every event of one finalization carries the same `attempt_id` field, and
//! every event after submission carries `document_number`.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,mostrador=debug";

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages, including phase changes
/// - `RUST_LOG=mostrador_engine=trace` - Trace for the engine only
/// - Default: [`DEFAULT_FILTER`]
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let filter = EnvFilter::try_new(DEFAULT_FILTER).unwrap();
        assert!(filter.to_string().contains("mostrador=debug"));
    }

    #[test]
    fn test_filter_caps_verbosity() {
        let filter = EnvFilter::try_new("warn").unwrap();
        assert_eq!(filter.max_level_hint(), Some(tracing::level_filters::LevelFilter::WARN));
    }
}
