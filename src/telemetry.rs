//! Tracing bootstrap for hosts that do not install their own subscriber.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "prompt_orchestrator=info";

/// Installs a fmt subscriber filtered by `RUST_LOG`, defaulting to
/// `prompt_orchestrator=info`.
///
/// Returns false if a global subscriber was already set; calling it again is
/// harmless.
pub fn init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
