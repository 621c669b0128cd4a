//! Command handlers
//!
//! This module contains the handlers the UI layer calls in response to user
//! actions on the recorder controls and settings panel.

pub mod recording;

pub use recording::RecorderController;
