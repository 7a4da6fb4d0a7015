//! Internal logging helpers for structured table events.

/// Single logging target for the crate.
pub(crate) const LOG_TARGET: &str = "async_table";

macro_rules! table_log {
    ($level:expr, table: $table:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {{
        if log::log_enabled!(target: crate::logging::LOG_TARGET, $level) {
            log::log!(
                target: crate::logging::LOG_TARGET,
                $level,
                "event={} table={} {}",
                $event,
                $table,
                format_args!($fmt $(, $args)*)
            );
        }
    }};
    ($level:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {{
        if log::log_enabled!(target: crate::logging::LOG_TARGET, $level) {
            log::log!(
                target: crate::logging::LOG_TARGET,
                $level,
                "event={} {}",
                $event,
                format_args!($fmt $(, $args)*)
            );
        }
    }};
}

pub(crate) use table_log;
