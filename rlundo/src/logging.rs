//! Diagnostic tracing for the checkpoint engine.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: engine diagnostics (forks, waits, exit
//!   signals), filtered by the `log` config value / `RLUNDO_LOG`, written to
//!   stderr so the host program's stdout stays untouched.
//!
//! - **Host-visible messages** (`undoing '...'`, the trailing newline on end of
//!   input): part of the product behavior, always written to stdout by
//!   [`crate::io::process::ProcessControl::emit`], unaffected by the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the given filter directive.
///
/// An unparsable directive falls back to `warn`. If the host process already
/// installed a global subscriber, it is kept and this call does nothing.
///
/// # Example
/// ```bash
/// RLUNDO_LOG=rlundo=debug rlundo bc
/// ```
pub fn init(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
