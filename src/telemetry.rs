//! Tracing setup for binaries and tests that embed the pipeline

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "pdf_ingest=info";

/// Install a fmt subscriber filtered by `RUST_LOG` (or `default_filter`)
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_filter: Option<&str>) -> bool {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.unwrap_or(DEFAULT_FILTER).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
