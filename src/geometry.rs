//! Overlay placement geometry
//!
//! Pixel dimensions, points, and the categorical placements used to put the
//! webcam overlay on top of the screen canvas.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while building geometry values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Dimension must be non-zero, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    #[error("Unknown overlay position: {0}")]
    UnknownPosition(String),
}

/// Width and height in pixels. Both are always greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDimension")]
pub struct Dimension {
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct RawDimension {
    width: u32,
    height: u32,
}

impl TryFrom<RawDimension> for Dimension {
    type Error = GeometryError;

    fn try_from(raw: RawDimension) -> Result<Self, Self::Error> {
        Dimension::new(raw.width, raw.height)
    }
}

impl Dimension {
    /// Create a dimension, rejecting zero-area sizes
    pub fn new(width: u32, height: u32) -> Result<Self, GeometryError> {
        if width == 0 || height == 0 {
            return Err(GeometryError::ZeroDimension { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels covered
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of an RGBA8 buffer with this dimension
    pub fn rgba_len(&self) -> usize {
        self.area() * 4
    }

    /// Byte offset of pixel `(x, y)` in a row-major RGBA8 buffer of this size
    pub fn rgba_offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Absolute canvas coordinate in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Named screen-relative placement for the webcam overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoricalPosition {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Default for CategoricalPosition {
    fn default() -> Self {
        Self::TopLeft
    }
}

impl CategoricalPosition {
    /// Every placement, in the order the settings panel lists them
    pub const ALL: [CategoricalPosition; 8] = [
        CategoricalPosition::TopLeft,
        CategoricalPosition::Top,
        CategoricalPosition::TopRight,
        CategoricalPosition::BottomLeft,
        CategoricalPosition::Bottom,
        CategoricalPosition::BottomRight,
        CategoricalPosition::Left,
        CategoricalPosition::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoricalPosition::Top => "top",
            CategoricalPosition::Bottom => "bottom",
            CategoricalPosition::Left => "left",
            CategoricalPosition::Right => "right",
            CategoricalPosition::TopLeft => "top-left",
            CategoricalPosition::TopRight => "top-right",
            CategoricalPosition::BottomLeft => "bottom-left",
            CategoricalPosition::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for CategoricalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoricalPosition {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoricalPosition::ALL
            .into_iter()
            .find(|position| position.as_str() == s)
            .ok_or_else(|| GeometryError::UnknownPosition(s.to_string()))
    }
}

/// Resolve a categorical placement to the overlay's top-left corner.
///
/// Corner placements sit flush against both named edges, offset by `margin`.
/// Single-edge placements are offset from that edge and centered along the
/// other axis.
pub fn resolve_position(
    category: CategoricalPosition,
    screen: Dimension,
    overlay: Dimension,
    margin: f64,
) -> Point {
    let screen_w = screen.width as f64;
    let screen_h = screen.height as f64;
    let overlay_w = overlay.width as f64;
    let overlay_h = overlay.height as f64;

    let left = margin;
    let right = screen_w - overlay_w - margin;
    let top = margin;
    let bottom = screen_h - overlay_h - margin;
    let center_x = (screen_w - overlay_w) / 2.0;
    let center_y = (screen_h - overlay_h) / 2.0;

    match category {
        CategoricalPosition::TopLeft => Point::new(left, top),
        CategoricalPosition::TopRight => Point::new(right, top),
        CategoricalPosition::BottomLeft => Point::new(left, bottom),
        CategoricalPosition::BottomRight => Point::new(right, bottom),
        CategoricalPosition::Top => Point::new(center_x, top),
        CategoricalPosition::Bottom => Point::new(center_x, bottom),
        CategoricalPosition::Left => Point::new(left, center_y),
        CategoricalPosition::Right => Point::new(right, center_y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(width: u32, height: u32) -> Dimension {
        Dimension::new(width, height).unwrap()
    }

    #[test]
    fn test_top_left_scenario() {
        let origin = resolve_position(
            CategoricalPosition::TopLeft,
            dim(1024, 768),
            dim(64, 64),
            10.0,
        );
        assert_eq!(origin, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_bottom_right_scenario() {
        let origin = resolve_position(
            CategoricalPosition::BottomRight,
            dim(1024, 768),
            dim(64, 64),
            10.0,
        );
        assert_eq!(origin, Point::new(950.0, 694.0));
    }

    #[test]
    fn test_single_edge_positions_are_centered() {
        let screen = dim(1000, 500);
        let overlay = dim(100, 50);

        let top = resolve_position(CategoricalPosition::Top, screen, overlay, 5.0);
        assert_eq!(top, Point::new(450.0, 5.0));

        let bottom = resolve_position(CategoricalPosition::Bottom, screen, overlay, 5.0);
        assert_eq!(bottom, Point::new(450.0, 445.0));

        let left = resolve_position(CategoricalPosition::Left, screen, overlay, 5.0);
        assert_eq!(left, Point::new(5.0, 225.0));

        let right = resolve_position(CategoricalPosition::Right, screen, overlay, 5.0);
        assert_eq!(right, Point::new(895.0, 225.0));
    }

    #[test]
    fn test_overlay_stays_inside_screen() {
        let screens = [dim(1024, 768), dim(640, 480), dim(200, 120), dim(65, 65)];
        let overlays = [dim(64, 64), dim(32, 48), dim(1, 1)];
        let margins = [0.0, 1.0, 10.0];

        for screen in screens {
            for overlay in overlays {
                for margin in margins {
                    let fits = overlay.width as f64 + margin <= screen.width as f64
                        && overlay.height as f64 + margin <= screen.height as f64;
                    if !fits {
                        continue;
                    }
                    for category in CategoricalPosition::ALL {
                        let p = resolve_position(category, screen, overlay, margin);
                        assert!(p.x >= 0.0, "{category} {screen} {overlay} {margin}");
                        assert!(p.y >= 0.0, "{category} {screen} {overlay} {margin}");
                        assert!(p.x + overlay.width as f64 <= screen.width as f64);
                        assert!(p.y + overlay.height as f64 <= screen.height as f64);
                    }
                }
            }
        }
    }

    #[test]
    fn test_position_names() {
        assert_eq!(
            "bottom-left".parse::<CategoricalPosition>().unwrap(),
            CategoricalPosition::BottomLeft
        );
        assert_eq!(
            "middle".parse::<CategoricalPosition>(),
            Err(GeometryError::UnknownPosition("middle".to_string()))
        );

        let json = serde_json::to_string(&CategoricalPosition::TopRight).unwrap();
        assert_eq!(json, "\"top-right\"");
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_rgba_offset_past_u32_range() {
        let dimension = Dimension::new(40_000, 30_000).unwrap();
        let expected = (29_999u64 * 40_000 + 39_999) * 4;
        assert_eq!(dimension.rgba_offset(39_999, 29_999) as u64, expected);
        assert!(expected > u32::MAX as u64);
        assert_eq!(dimension.rgba_offset(39_999, 29_999) + 4, dimension.rgba_len());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(Dimension::new(0, 10).is_err());
        assert!(Dimension::new(10, 0).is_err());

        let parsed: Result<Dimension, _> = serde_json::from_str(r#"{"width":0,"height":5}"#);
        assert!(parsed.is_err());

        let parsed: Dimension = serde_json::from_str(r#"{"width":64,"height":48}"#).unwrap();
        assert_eq!(parsed, dim(64, 48));
    }
}
