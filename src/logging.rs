//! Tracing subscriber setup for the binary.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::errors::Error;

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,ankivec=debug"
    } else {
        "warn,ankivec=info"
    }
}

/// Install the global subscriber. Logs go to stderr so `--json` output on
/// stdout stays clean. `RUST_LOG` takes precedence over `verbose`.
pub fn init(verbose: bool) -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose),
        )
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {e}")))
}
