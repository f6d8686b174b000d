//! Tracing setup for wkgen.
//!
//! Everything goes to stderr so reports printed on stdout stay parseable.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter for a CLI run: pipeline progress when verbose, otherwise
/// only warnings
pub fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn"
    }
}

/// Initialize logging for the `wkgen` binary
///
/// `RUST_LOG` overrides the level picked from `verbose`.
pub fn init(verbose: bool) {
    init_with_level(default_level(verbose))
}

/// Initialize logging with a specific default level
///
/// # Arguments
/// * `level` - Default filter directive (debug, info, warn, error)
pub fn init_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Initialize logging for testing (captures logs for test output)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_selects_info() {
        assert_eq!(default_level(true), "info");
        assert_eq!(default_level(false), "warn");
    }
}
