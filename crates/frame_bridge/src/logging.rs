//! Logging setup shared by the server and tools

pub use log::{debug, error, info, trace, warn};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Initialize the logging system
///
/// Honors `RUST_LOG`; falls back to [`DEFAULT_FILTER`].
pub fn init() {
    init_with_default_filter(DEFAULT_FILTER);
}

/// Initialize logging with a custom fallback filter
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_with_default_filter(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env).format_timestamp_millis().try_init();
}
