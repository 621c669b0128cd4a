//! Capture acquisition
//!
//! Stream traits, frames, and the helpers that request the screen and webcam
//! streams for a recording session.

pub mod acquisition;
pub mod frame;
pub mod synthetic;
pub mod traits;

pub use acquisition::{acquire_screen_stream, acquire_streams, acquire_webcam_stream};
pub use frame::{FrameError, VideoFrame};
pub use synthetic::{SyntheticCaptureProvider, SyntheticSettings, SyntheticStream};
pub use traits::{
    CaptureError, CaptureFailure, CaptureProvider, MediaConstraints, MediaStream, StreamHandle,
    StreamKind,
};
