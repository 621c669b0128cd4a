//! Video frames
//!
//! RGBA8 pixel buffers passed between capture streams, the canvas and the
//! recording engine.

use crate::geometry::Dimension;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while building or encoding frames
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame data has {actual} bytes, expected {expected} for {dimension}")]
    SizeMismatch {
        dimension: Dimension,
        expected: usize,
        actual: usize,
    },

    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
}

/// A single RGBA8 video frame.
///
/// Pixel data is reference counted so frames can be handed out from a live
/// stream on every draw without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    dimension: Dimension,
    data: Arc<[u8]>,
}

impl VideoFrame {
    /// Wrap raw RGBA8 data
    pub fn new(dimension: Dimension, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = dimension.rgba_len();
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                dimension,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            dimension,
            data: data.into(),
        })
    }

    /// A frame filled with one color
    pub fn solid(dimension: Dimension, rgba: [u8; 4]) -> Self {
        let data: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(dimension.rgba_len())
            .collect();
        Self {
            dimension,
            data: data.into(),
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn width(&self) -> u32 {
        self.dimension.width()
    }

    pub fn height(&self) -> u32 {
        self.dimension.height()
    }

    /// Raw RGBA8 bytes, row major
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGBA value at `(x, y)`, or `None` when out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let idx = self.dimension.rgba_offset(x, y);
        let px = &self.data[idx..idx + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Encode the frame as a PNG image
    pub fn encode_png(&self) -> Result<Vec<u8>, FrameError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width(), self.height());
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.data)?;
        }
        Ok(out)
    }
}
