#![deny(missing_docs)]
//! Shared logging utilities for the upload workspace.
//!
//! This crate provides the `upload_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger.

#[doc(hidden)]
pub use log;

use log::LevelFilter;

/// Picks the log level for a run.
///
/// Verbose runs log at debug; otherwise debug builds log at debug and release
/// builds at info.
pub fn default_level(verbose: bool) -> LevelFilter {
    if verbose || cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! upload_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! upload_info {
    ($($arg:tt)*) => {{
        $crate::log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! upload_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! upload_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! upload_error {
    ($($arg:tt)*) => {{
        $crate::log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        default_level(false),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
