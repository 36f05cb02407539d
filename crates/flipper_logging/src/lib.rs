#![deny(missing_docs)]
//! Logging macros shared by the flipper crates.
//!
//! Every crate logs through `flipper_trace!` .. `flipper_error!`, which forward to the
//! `log` facade re-exported here, so callers do not need their own `log` dependency.
//! The binary installs the real logger; tests call [`initialize_for_tests`].

use std::str::FromStr;

#[doc(hidden)]
pub use log as __log;

pub use log::LevelFilter;

/// Environment variable that overrides the level used by [`initialize_for_tests`].
pub const TEST_LOG_ENV: &str = "FLIPPER_TEST_LOG";

/// Logs at trace level. Reserved for per-record and per-tick chatter.
#[macro_export]
macro_rules! flipper_trace {
    ($($arg:tt)*) => {{
        $crate::__log::trace!($($arg)*);
    }};
}

/// Logs at debug level.
#[macro_export]
macro_rules! flipper_debug {
    ($($arg:tt)*) => {{
        $crate::__log::debug!($($arg)*);
    }};
}

/// Logs at info level.
#[macro_export]
macro_rules! flipper_info {
    ($($arg:tt)*) => {{
        $crate::__log::info!($($arg)*);
    }};
}

/// Logs at warn level. Used for every remote failure and skipped record.
#[macro_export]
macro_rules! flipper_warn {
    ($($arg:tt)*) => {{
        $crate::__log::warn!($($arg)*);
    }};
}

/// Logs at error level.
#[macro_export]
macro_rules! flipper_error {
    ($($arg:tt)*) => {{
        $crate::__log::error!($($arg)*);
    }};
}

/// Level for test logging: `FLIPPER_TEST_LOG` if it parses, `Debug` otherwise.
pub fn test_level() -> LevelFilter {
    std::env::var(TEST_LOG_ENV)
        .ok()
        .and_then(|raw| LevelFilter::from_str(raw.trim()).ok())
        .unwrap_or(LevelFilter::Debug)
}

/// Installs a terminal logger for tests.
///
/// Safe to call from many tests; only the first call in a process takes effect.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode};

    let config = ConfigBuilder::new()
        .add_filter_allow_str("flipper")
        .build();

    let _ = CombinedLogger::init(vec![TermLogger::new(
        test_level(),
        config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_expand_without_a_log_dependency() {
        initialize_for_tests();
        flipper_trace!("trace {}", 1);
        flipper_debug!("debug {}", 2);
        flipper_info!("info");
        flipper_warn!("warn {value}", value = 4);
        flipper_error!("error");
    }
}
