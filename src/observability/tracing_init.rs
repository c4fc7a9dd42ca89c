//! Structured tracing setup, controlled by `RUST_LOG` (spec SPEC_FULL §A.1).
//!
//! Default level is `warn`, matching spec §6's STDERR contract: only
//! file-access errors and the first critical-threshold report are emitted
//! by default. Raising `RUST_LOG` adds phase- and element-level detail
//! for local debugging without touching the pass/fail contract.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. Safe to call once per
/// process; a second call is a no-op rather than a panic, since tests may
/// invoke it more than once across the binary.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
