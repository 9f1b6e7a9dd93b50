//! Logging setup for the server binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose events are shown at the default level.
const CRATES: &[&str] = &[
    "tally",
    "tally_transport",
    "tally_protocol",
    "tally_session",
    "tally_room",
    "tally_server",
];

/// Builds the filter directive used when `RUST_LOG` is not set.
pub fn default_directive(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides `default_level` when set.
pub fn setup_logger(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
