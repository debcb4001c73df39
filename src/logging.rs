//! Tracing setup for embedders of the engine.

use tracing_subscriber::EnvFilter;

use crate::Result;
use crate::error::DbPulseError;

/// Maps a quiet flag and a verbosity count to a default filter directive.
/// `RUST_LOG`, when set, overrides this entirely.
fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global tracing subscriber.
///
/// The filter defaults to INFO, raised to DEBUG/TRACE by `verbose` and
/// lowered to ERROR by `quiet`; a `RUST_LOG` environment variable takes
/// precedence over both.
///
/// # Errors
/// Returns `InvalidConfiguration` if a global subscriber is already
/// installed.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| {
            DbPulseError::invalid_configuration(format!("failed to initialize logging: {}", e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process, so only
    // the directive selection is covered here.
    #[test]
    fn test_default_directives() {
        assert_eq!(default_directive(0, true), "error");
        assert_eq!(default_directive(3, true), "error");
        assert_eq!(default_directive(0, false), "info");
        assert_eq!(default_directive(1, false), "debug");
        assert_eq!(default_directive(2, false), "trace");
        assert_eq!(default_directive(255, false), "trace");
    }
}
