//! Tracing subscriber setup for the command-line tool

use std::fmt::Display;
use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset.
/// -v: INFO, -vv: DEBUG, -vvv: TRACE, default WARN
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber, writing to stderr.
///
/// Library code only emits events; the binary calls this once at startup.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbose)));

    // A subscriber may already be installed when embedded in another tool
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn log_info<T: Display>(msg: T) {
    tracing::info!("{}", msg);
}

pub fn log_warn<T: Display>(msg: T) {
    tracing::warn!("{}", msg);
}

/// `format!`-style shorthand for [`log_info`]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::utils::logger::log_info(format!($($arg)*))
    };
}

/// `format!`-style shorthand for [`log_warn`]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::utils::logger::log_warn(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(7), "trace");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init(1);
        init(2);
        crate::log_info!("applied {}", "Pod[web]");
        crate::log_warn!("ignored failure of {}", "delete");
    }
}
