use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Default directive used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "wimbridge=info";

/// Initialise tracing subscriber once per process.
///
/// Every crate in the workspace logs under a `wimbridge*` target, so the
/// default directive covers the loader, the resolver and the error channel.
pub fn init_logging() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        // Another subscriber may already be installed by the embedding application.
        let _ = fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .try_init();
    });
}
