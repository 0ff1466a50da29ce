//! Diagnostic logging, off unless `LAZYWORK_LOG` is set.
//!
//! The shell wrapper captures stderr together with stdout, so any default
//! log output would corrupt the `cd` line it evaluates.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const ENV_VAR: &str = "LAZYWORK_LOG";

pub fn init() {
    let filter = EnvFilter::try_from_env(ENV_VAR).unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
