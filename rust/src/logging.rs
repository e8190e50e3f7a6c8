//! Verbosity-gated logging over the `log` facade.
//!
//! Each analysis carries a numeric verbosity from its config; a record is only
//! formatted when that verbosity reaches the macro's level, so a silent run pays
//! a single integer comparison.
//! - 0: SILENT (warnings and errors only, through `log::warn!`/`log::error!`)
//! - 1: CHANGES (phase results, write-backs) at `info`
//! - 2: CHECKS (per-task decisions, skipped edges, scenario targets) at `debug`
//! - 3: DEBUG (forward/backward pass internals) at `trace`

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// The `log` level a verbosity level is emitted at.
pub const fn level_for(verbosity: u8) -> log::Level {
    match verbosity {
        0 | 1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_at {
    ($min:expr, $verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $min {
            ::log::log!($crate::logging::level_for($min), $($arg)*);
        }
    };
}

/// Log at CHANGES level (verbosity >= 1).
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_CHANGES, $verbosity, $($arg)*)
    };
}

/// Log at CHECKS level (verbosity >= 2).
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_CHECKS, $verbosity, $($arg)*)
    };
}

/// Log at DEBUG level (verbosity >= 3).
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_DEBUG, $verbosity, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_map_to_log_levels() {
        assert_eq!(level_for(VERBOSITY_CHANGES), log::Level::Info);
        assert_eq!(level_for(VERBOSITY_CHECKS), log::Level::Debug);
        assert_eq!(level_for(VERBOSITY_DEBUG), log::Level::Trace);
    }

    #[test]
    fn test_macros_expand_at_every_verbosity() {
        for verbosity in VERBOSITY_SILENT..=VERBOSITY_DEBUG {
            log_changes!(verbosity, "phase {}", 1);
            log_checks!(verbosity, "task {}", "a");
            log_debug!(verbosity, "es={} ef={}", 0, 3);
        }
    }
}
