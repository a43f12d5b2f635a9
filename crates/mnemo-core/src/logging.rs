//! Logging setup.
//!
//! The dispatch surface talks JSON-RPC over stdio, so every log line MUST go to
//! stderr — stdout is reserved for the protocol.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::env;

/// Initialize global tracing output to stderr, honoring `RUST_LOG`.
///
/// Safe to call at most once per process; a second call is a silent no-op
/// (the global subscriber can only be installed once).
pub fn init_logging() {
    let filter = std::env::var(env::logging::RUST_LOG)
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
