//! Logging setup driven by environment variables.
//!
//! # Environment Variables
//!
//! - `RELWEAVE_DEBUG=true|1|yes` - Enable debug logging
//! - `RELWEAVE_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `RELWEAVE_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! The library itself only emits `tracing` events: `debug!` for plan and
//! hydration summaries, `trace!` per alias and per row. Installing a
//! subscriber requires the `tracing-subscriber` feature:
//!
//! ```rust,no_run
//! use relweave_query::logging;
//!
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "RELWEAVE_DEBUG";
const LEVEL_VAR: &str = "RELWEAVE_LOG_LEVEL";
const FORMAT_VAR: &str = "RELWEAVE_LOG_FORMAT";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }

    /// Name as accepted by `RELWEAVE_LOG_FORMAT`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

/// Check if debug logging is enabled via `RELWEAVE_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Level from `RELWEAVE_LOG_LEVEL`; `debug` when debugging is on, otherwise `warn`.
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var(LEVEL_VAR) {
        Ok(level) => match level.to_ascii_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Format from `RELWEAVE_LOG_FORMAT`.
pub fn get_log_format() -> LogFormat {
    env::var(FORMAT_VAR)
        .map(|f| LogFormat::parse(&f))
        .unwrap_or_default()
}

/// Install the global subscriber once; later calls are no-ops.
///
/// Nothing is installed unless `RELWEAVE_DEBUG` or `RELWEAVE_LOG_LEVEL` is set,
/// so applications that bring their own subscriber are left alone.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let format = get_log_format();
            let filter = EnvFilter::try_new(format!("relweave={},relweave_query={}", level, level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let installed = match format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level, format = format.as_str(), "relweave logging initialized");
            }
        }
    });
}

/// Initialize logging with a specific level.
///
/// # Safety
///
/// Sets `RELWEAVE_LOG_LEVEL`; call it at startup before spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: documented as a startup-only call.
    unsafe {
        env::set_var(LEVEL_VAR, level);
    }
    init();
}

/// Equivalent to `RELWEAVE_DEBUG=true` followed by [`init`].
///
/// # Safety
///
/// Sets `RELWEAVE_DEBUG`; call it at startup before spawning threads.
pub fn init_debug() {
    // SAFETY: documented as a startup-only call.
    unsafe {
        env::set_var(DEBUG_VAR, "true");
    }
    init();
}

/// Debug event emitted only when `RELWEAVE_DEBUG` is set.
#[macro_export]
macro_rules! relweave_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            $crate::__tracing::debug!($($arg)*);
        }
    };
}

/// Trace event emitted only when `RELWEAVE_DEBUG` is set.
#[macro_export]
macro_rules! relweave_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            $crate::__tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Json);
        assert_eq!(LogFormat::Compact.as_str(), "compact");
    }

    #[test]
    fn test_defaults_without_env() {
        // SAFETY: these variables are only touched by this test.
        unsafe {
            env::remove_var(DEBUG_VAR);
            env::remove_var(LEVEL_VAR);
        }
        assert!(!is_debug_enabled());
        assert_eq!(get_log_level(), "warn");
    }
}
