//! Logging macros that compile to nothing without the `logging` feature.

/// Emits a `tracing` error event when the "logging" feature is enabled.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {{
        #[cfg(feature = "logging")]
        tracing::error!($($arg)*);
    }};
}

/// Emits a `tracing` debug event when the "logging" feature is enabled.
///
/// Only public values go through here. Scalars, PRKs and derived keys never do.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {{
        #[cfg(feature = "logging")]
        tracing::debug!($($arg)*);
    }};
}
