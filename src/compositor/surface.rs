//! Drawing surface abstraction
//!
//! The 2D canvas the compositor draws into. Mirrors the handful of canvas
//! operations the draw loop needs: scaled image draws, path building,
//! clipping, scoped save/restore, and deriving a capturable stream.

use super::CompositorError;
use crate::capture::{StreamHandle, VideoFrame};
use crate::geometry::Dimension;
use parking_lot::Mutex;
use std::sync::Arc;

pub trait DrawingSurface: Send {
    /// Current draw surface size, `None` while it has no area
    fn dimension(&self) -> Option<Dimension>;

    /// Resize the surface. Clears its contents.
    fn set_dimension(&mut self, dimension: Dimension);

    /// Draw `frame` scaled into the rectangle at `(x, y)`
    fn draw_image(&mut self, frame: &VideoFrame, x: f64, y: f64, width: f64, height: f64);

    /// Push the current clip state
    fn save(&mut self);

    /// Pop back to the last saved clip state
    fn restore(&mut self);

    /// Start a new path, discarding the current one
    fn begin_path(&mut self);

    /// Add an arc around `(cx, cy)`; angles in radians, clockwise from +x
    fn arc(&mut self, cx: f64, cy: f64, radius: f64, start_angle: f64, end_angle: f64);

    /// Add a rectangle with rounded corners
    fn rounded_rect(&mut self, x: f64, y: f64, width: f64, height: f64, radius: f64);

    /// Intersect the clip region with the current path
    fn clip(&mut self);

    /// Derive a live stream of this surface's contents
    fn capture_stream(&self) -> Result<StreamHandle, CompositorError>;
}

/// Surface shared between the session owner and the draw loop
pub type SharedSurface = Arc<Mutex<dyn DrawingSurface>>;
