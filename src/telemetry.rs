//! Tracing setup shared by the demo binary and anything embedding the engine.

use std::io;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Install a stderr subscriber once. `TVOSD_LOG` overrides the default level
/// so field runs can be turned up without rebuilding.
pub fn init_tracing(verbose: bool) {
    let _ = TRACING_INIT.get_or_init(|| {
        let default = if verbose { "tvosd=debug" } else { "tvosd=info" };
        let filter = EnvFilter::try_from_env("TVOSD_LOG").unwrap_or_else(|_| EnvFilter::new(default));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
