#![deny(missing_docs)]
//! Shared logging utilities for the queue sync workspace.
//!
//! This crate provides the `queue_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. The macros go through
//! the `log` facade re-exported here, so callers do not need their own `log`
//! dependency.

#[doc(hidden)]
pub use log as __log;

/// Target used by every `queue_*` macro so the sync engine can be filtered as a unit.
pub const LOG_TARGET: &str = "queue_sync";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! queue_trace {
    ($($arg:tt)*) => {{
        $crate::__log::trace!(target: $crate::LOG_TARGET, $($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! queue_debug {
    ($($arg:tt)*) => {{
        $crate::__log::debug!(target: $crate::LOG_TARGET, $($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! queue_info {
    ($($arg:tt)*) => {{
        $crate::__log::info!(target: $crate::LOG_TARGET, $($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! queue_warn {
    ($($arg:tt)*) => {{
        $crate::__log::warn!(target: $crate::LOG_TARGET, $($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! queue_error {
    ($($arg:tt)*) => {{
        $crate::__log::error!(target: $crate::LOG_TARGET, $($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    #[test]
    fn macros_expand_without_a_logger() {
        crate::queue_trace!("trace {}", 1);
        crate::queue_debug!("debug {}", 2);
        crate::queue_info!("info");
        crate::queue_warn!("warn {value}", value = 3);
        crate::queue_error!("error");
    }

    #[test]
    fn test_initializer_is_reentrant() {
        super::initialize_for_tests();
        super::initialize_for_tests();
        crate::queue_info!("logger initialized twice without panicking");
    }
}
