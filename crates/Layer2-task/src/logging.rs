//! Subscriber setup for hosts that log through `tracing`

use crate::capture::{passthrough, CaptureLayer};
use arbor_foundation::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber: `RUST_LOG` (or `default_level`) filtering,
/// a stderr fmt layer that goes quiet while a task tree is live, and the
/// [`CaptureLayer`] that routes events into task transcripts.
pub fn init(default_level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(passthrough()),
        )
        .with(CaptureLayer::new())
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install subscriber: {}", e)))
}
