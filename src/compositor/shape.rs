//! Overlay masks
//!
//! Scoped clip helpers: save the surface state, clip to a shape, run the
//! draw callback, restore.

use super::surface::DrawingSurface;
use crate::geometry::{Dimension, Point};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Mask applied to the webcam overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OverlayShape {
    Circle,
    RoundedRect { radius: f64 },
}

impl Default for OverlayShape {
    fn default() -> Self {
        Self::Circle
    }
}

impl OverlayShape {
    /// Clip to this shape laid over the box at `origin`, then run `draw`
    pub fn clip<F>(&self, surface: &mut dyn DrawingSurface, origin: Point, size: Dimension, draw: F)
    where
        F: FnOnce(&mut dyn DrawingSurface),
    {
        match *self {
            OverlayShape::Circle => {
                let radius = size.width() as f64 / 2.0;
                circle_clip(surface, origin.x, origin.y, radius, draw);
            }
            OverlayShape::RoundedRect { radius } => rounded_rect_clip(
                surface,
                origin.x,
                origin.y,
                size.width() as f64,
                size.height() as f64,
                radius,
                draw,
            ),
        }
    }
}

/// Clip to the circle inscribed in the square whose top-left corner is
/// `(x, y)` and whose side is `2 * radius`
pub fn circle_clip<F>(surface: &mut dyn DrawingSurface, x: f64, y: f64, radius: f64, draw: F)
where
    F: FnOnce(&mut dyn DrawingSurface),
{
    surface.save();
    surface.begin_path();
    surface.arc(x + radius, y + radius, radius, 0.0, TAU);
    surface.clip();
    draw(&mut *surface);
    surface.restore();
}

/// Clip to a rounded rectangle
pub fn rounded_rect_clip<F>(
    surface: &mut dyn DrawingSurface,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    radius: f64,
    draw: F,
) where
    F: FnOnce(&mut dyn DrawingSurface),
{
    surface.save();
    surface.begin_path();
    surface.rounded_rect(x, y, width, height, radius);
    surface.clip();
    draw(&mut *surface);
    surface.restore();
}
