//! Screencam - screen recording with a webcam overlay.
//!
//! This is the main library crate. It captures a screen stream and a webcam
//! stream, composites them onto one canvas and records the canvas into a
//! single video artifact.

pub mod capture;
pub mod commands;
pub mod compositor;
pub mod config;
pub mod geometry;
pub mod recorder;
pub mod sink;
pub mod utils;

pub use commands::RecorderController;
pub use config::RecorderConfig;
pub use recorder::{RecordingCoordinator, RecordingError, RecordingStatus};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`, defaulting to debug output for this crate. Does nothing
/// if a subscriber is already installed.
pub fn init_tracing() {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "screencam=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_ok() {
        tracing::info!("Starting screencam v{}", env!("CARGO_PKG_VERSION"));
    }
}
