//! Recording system module
//!
//! This module ties capture, compositing and the sink together:
//! - RecordingCoordinator owns the status machine and the active session
//! - CompositeSession holds every stream and task one recording owns
//! - RecordingError is the error surface of the whole pipeline

pub mod coordinator;
pub mod error;
pub mod session;
pub mod state;

pub use coordinator::{RecordingCoordinator, RecordingEvent};
pub use error::{RecordingError, RecordingResult};
pub use session::{CompositeSession, SessionInfo};
pub use state::{RecordingSegment, RecordingStatus};
