//! Diagnostic logging setup.

use std::env;
use std::io;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "SYNC_FIXTURE_LOG";

/// Filter used when [`LOG_ENV`] is unset or blank.
pub const DEFAULT_FILTER: &str = "warn";

/// Chooses the filter directives from the raw [`LOG_ENV`] value.
#[must_use]
pub fn filter_directives(raw: Option<&str>) -> &str {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => DEFAULT_FILTER,
    }
}

/// Installs a stderr subscriber filtered by [`LOG_ENV`].
///
/// Invalid directives fall back to [`DEFAULT_FILTER`]. Calling this more than
/// once keeps the first subscriber.
pub fn init_logging() {
    let raw = env::var(LOG_ENV).ok();
    let filter = EnvFilter::try_new(filter_directives(raw.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .try_init()
        .ok();
}
