//! Software canvas
//!
//! An RGBA8 drawing surface with a clip stack. Image draws are nearest
//! neighbour scaled and alpha blended; a pixel is painted only when its
//! center lies inside every clip region pushed so far.

use super::surface::DrawingSurface;
use super::CompositorError;
use crate::capture::{FrameError, MediaStream, StreamHandle, StreamKind, VideoFrame};
use crate::geometry::Dimension;
use parking_lot::RwLock;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// One subpath of the current path
#[derive(Debug, Clone, Copy, PartialEq)]
enum PathShape {
    Arc {
        cx: f64,
        cy: f64,
        radius: f64,
        start: f64,
        sweep: f64,
    },
    RoundedRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radius: f64,
    },
}

impl PathShape {
    fn contains(&self, px: f64, py: f64) -> bool {
        match *self {
            PathShape::Arc {
                cx,
                cy,
                radius,
                start,
                sweep,
            } => {
                let dx = px - cx;
                let dy = py - cy;
                if dx * dx + dy * dy > radius * radius {
                    return false;
                }
                if sweep >= TAU {
                    return true;
                }
                let angle = dy.atan2(dx);
                (angle - start).rem_euclid(TAU) <= sweep
            }
            PathShape::RoundedRect {
                x,
                y,
                width,
                height,
                radius,
            } => {
                if px < x || py < y || px > x + width || py > y + height {
                    return false;
                }
                let r = radius.min(width / 2.0).min(height / 2.0).max(0.0);
                let nearest_x = px.clamp(x + r, x + width - r);
                let nearest_y = py.clamp(y + r, y + height - r);
                let dx = px - nearest_x;
                let dy = py - nearest_y;
                dx * dx + dy * dy <= r * r
            }
        }
    }
}

/// Clip state: the intersection of every region, each region being the
/// union of its subpaths
type ClipStack = Vec<Vec<PathShape>>;

struct CanvasBuffer {
    dimension: Option<Dimension>,
    pixels: Vec<u8>,
}

impl CanvasBuffer {
    fn snapshot(&self) -> Option<VideoFrame> {
        let dimension = self.dimension?;
        VideoFrame::new(dimension, self.pixels.clone()).ok()
    }
}

/// In-memory canvas implementing `DrawingSurface`
pub struct PixelCanvas {
    buffer: Arc<RwLock<CanvasBuffer>>,
    path: Vec<PathShape>,
    clip: ClipStack,
    saved: Vec<ClipStack>,
}

impl PixelCanvas {
    /// Create a canvas. A zero width or height leaves it without a draw
    /// surface until `set_dimension` is called.
    pub fn new(width: u32, height: u32) -> Self {
        let dimension = Dimension::new(width, height).ok();
        let pixels = vec![0; dimension.map(|d| d.rgba_len()).unwrap_or(0)];
        Self {
            buffer: Arc::new(RwLock::new(CanvasBuffer { dimension, pixels })),
            path: Vec::new(),
            clip: Vec::new(),
            saved: Vec::new(),
        }
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Option<VideoFrame> {
        self.buffer.read().snapshot()
    }

    /// Current contents encoded as PNG, `None` while the canvas has no area
    pub fn snapshot_png(&self) -> Result<Option<Vec<u8>>, FrameError> {
        self.snapshot().map(|frame| frame.encode_png()).transpose()
    }

    fn clip_contains(&self, px: f64, py: f64) -> bool {
        self.clip
            .iter()
            .all(|region| region.iter().any(|shape| shape.contains(px, py)))
    }
}

impl DrawingSurface for PixelCanvas {
    fn dimension(&self) -> Option<Dimension> {
        self.buffer.read().dimension
    }

    fn set_dimension(&mut self, dimension: Dimension) {
        let mut buffer = self.buffer.write();
        if buffer.dimension == Some(dimension) {
            return;
        }
        buffer.dimension = Some(dimension);
        buffer.pixels = vec![0; dimension.rgba_len()];
        self.path.clear();
        self.clip.clear();
        self.saved.clear();
    }

    fn draw_image(&mut self, frame: &VideoFrame, x: f64, y: f64, width: f64, height: f64) {
        if !(width > 0.0 && height > 0.0) {
            return;
        }
        let mut buffer = self.buffer.write();
        let Some(canvas) = buffer.dimension else {
            return;
        };

        let canvas_w = canvas.width() as f64;
        let canvas_h = canvas.height() as f64;
        let x0 = x.floor().clamp(0.0, canvas_w) as u32;
        let x1 = (x + width).ceil().clamp(0.0, canvas_w) as u32;
        let y0 = y.floor().clamp(0.0, canvas_h) as u32;
        let y1 = (y + height).ceil().clamp(0.0, canvas_h) as u32;

        let src_w = frame.width();
        let src_h = frame.height();

        for py in y0..y1 {
            let center_y = py as f64 + 0.5;
            if center_y < y || center_y >= y + height {
                continue;
            }
            let sy = (((center_y - y) / height) * src_h as f64) as u32;
            let sy = sy.min(src_h - 1);

            for px in x0..x1 {
                let center_x = px as f64 + 0.5;
                if center_x < x || center_x >= x + width {
                    continue;
                }
                if !self.clip_contains(center_x, center_y) {
                    continue;
                }
                let sx = (((center_x - x) / width) * src_w as f64) as u32;
                let sx = sx.min(src_w - 1);

                let Some(src) = frame.pixel(sx, sy) else {
                    continue;
                };
                let idx = canvas.rgba_offset(px, py);
                blend_pixel(&mut buffer.pixels[idx..idx + 4], src);
            }
        }
    }

    fn save(&mut self) {
        self.saved.push(self.clip.clone());
    }

    fn restore(&mut self) {
        if let Some(clip) = self.saved.pop() {
            self.clip = clip;
        }
    }

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn arc(&mut self, cx: f64, cy: f64, radius: f64, start_angle: f64, end_angle: f64) {
        let raw = end_angle - start_angle;
        let sweep = if raw >= TAU { TAU } else { raw.rem_euclid(TAU) };
        self.path.push(PathShape::Arc {
            cx,
            cy,
            radius,
            start: start_angle,
            sweep,
        });
    }

    fn rounded_rect(&mut self, x: f64, y: f64, width: f64, height: f64, radius: f64) {
        self.path.push(PathShape::RoundedRect {
            x,
            y,
            width,
            height,
            radius,
        });
    }

    fn clip(&mut self) {
        // An empty path clips everything away
        self.clip.push(self.path.clone());
    }

    fn capture_stream(&self) -> Result<StreamHandle, CompositorError> {
        let dimension = self.dimension().ok_or(CompositorError::CanvasNotReady)?;
        let stream = CanvasStream {
            id: Uuid::new_v4(),
            dimension,
            buffer: self.buffer.clone(),
            live: AtomicBool::new(true),
        };
        tracing::debug!("Canvas stream {} captured at {}", stream.id, dimension);
        Ok(Arc::new(stream))
    }
}

/// Source-over blend of one RGBA pixel
fn blend_pixel(dst: &mut [u8], src: [u8; 4]) {
    let alpha = src[3] as u32;
    if alpha == 255 {
        dst.copy_from_slice(&src);
        return;
    }
    if alpha == 0 {
        return;
    }
    let inv = 255 - alpha;
    for c in 0..3 {
        dst[c] = ((src[c] as u32 * alpha + dst[c] as u32 * inv) / 255) as u8;
    }
    dst[3] = (alpha + dst[3] as u32 * inv / 255).min(255) as u8;
}

/// Live view of a canvas's pixels
struct CanvasStream {
    id: Uuid,
    dimension: Dimension,
    buffer: Arc<RwLock<CanvasBuffer>>,
    live: AtomicBool,
}

impl MediaStream for CanvasStream {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> StreamKind {
        StreamKind::Composite
    }

    fn dimension(&self) -> Dimension {
        self.buffer.read().dimension.unwrap_or(self.dimension)
    }

    fn latest_frame(&self) -> Option<VideoFrame> {
        if !self.is_live() {
            return None;
        }
        self.buffer.read().snapshot()
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop_tracks(&self) -> bool {
        self.live.swap(false, Ordering::SeqCst)
    }
}
