//! Logging initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter used when neither `RUST_LOG` nor the config file provides one.
pub const DEFAULT_LOG_FILTER: &str = "info,triangle=debug";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used. Output goes
/// through a `fmt` layer with targets and thread ids.
///
/// # Example
/// ```
/// triangle_core::init_logging(triangle_core::DEFAULT_LOG_FILTER);
/// tracing::info!("Logging ready");
/// ```
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}
