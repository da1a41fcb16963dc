//! Opt-in log output for hosts without their own subscriber
//!
//! The crate only emits `tracing` events. Call [`init`] once to print them to
//! stderr, filtered by `RUST_LOG` (default `warn`).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "warn";

/// Install a stderr fmt subscriber
///
/// Returns `false` when a global subscriber was already installed; that
/// subscriber is left in place.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_names(true),
        )
        .with(filter)
        .try_init()
        .is_ok()
}
