//! Logging setup
//!
//! Import progress and per-item failures go through `tracing`. Output is
//! written to stderr so stdout stays free for command results.
//!
//! `RUST_LOG` takes precedence over the command-line verbosity, e.g.
//! `RUST_LOG=ion_import=debug`.

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive for the given verbosity flags
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_directives() {
        assert_eq!(default_directive(false, false), "info");
        assert_eq!(default_directive(true, false), "debug");
        assert_eq!(default_directive(false, true), "warn");
        // --verbose wins over --quiet
        assert_eq!(default_directive(true, true), "debug");
    }
}
