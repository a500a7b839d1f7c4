//! Diagnostic tracing for the interlock.
//!
//! - **Tracing (this module)**: diagnostics via `RUST_LOG`, output to stderr so
//!   stdout stays free for JSON results and protocol messages.
//! - **Audit trail (`io/audit`)**: overrides and blocks in `.interlock/audit.log`.
//!   Always written, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset.
///
/// # Example
/// ```bash
/// RUST_LOG=interlock=debug interlock serve
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
