//! Diagnostic logging setup.
//!
//! `ARBOR_LOG` takes an `EnvFilter` directive (e.g. `arbor=debug`). Without it
//! the level follows the CLI flags: `--verbose` enables debug output for this
//! crate, `--quiet` limits it to errors, otherwise warnings and above.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "arbor=debug,warn"
    } else if quiet {
        "error"
    } else {
        "warn"
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool, quiet: bool) {
    INIT.get_or_init(|| {
        let filter = std::env::var("ARBOR_LOG")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| EnvFilter::try_new(s).ok())
            .unwrap_or_else(|| EnvFilter::new(default_directive(verbose, quiet)));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(crate::color_enabled_stderr())
            .without_time()
            .with_target(false)
            .try_init();
    });
}
