// Core types shared by capture, vision, tracking and the debug window.

use serde::Deserialize;
use std::ops::Sub;

/// One captured frame: RGB, row-major, owned by the loop iteration that grabbed it.
pub type Frame = image::RgbImage;

/// Single-channel detection mask; any non-zero value is foreground.
pub type Mask = image::GrayImage;

/// Value written for pixels that pass the color test (before smoothing).
pub const MASK_ON: u8 = 255;

/// Packed pixels for the debug window.
#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    pub fn from_frame(frame: &Frame) -> Self {
        let pixels = frame
            .pixels()
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
            .collect();
        Self { width: frame.width() as usize, height: frame.height() as usize, pixels }
    }
}

/// Integer point in frame pixels; x grows rightward, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position2D {
    pub x: i32,
    pub y: i32,
}

impl Position2D {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Pixel vector from a reference point to a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Sub for Position2D {
    type Output = Offset;

    fn sub(self, rhs: Position2D) -> Offset {
        Offset { dx: self.x - rhs.x, dy: self.y - rhs.y }
    }
}

/// Axis-aligned box, (x, y) is the top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    pub fn center(&self) -> Position2D {
        Position2D::new(self.x + self.w / 2, self.y + self.h / 2)
    }
}

/// Rectangle excluded from detection. Top-left inclusive, bottom-right exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Roi {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Roi {
    pub const fn new(top_left: (i32, i32), bottom_right: (i32, i32)) -> Self {
        Self { left: top_left.0, top: top_left.1, right: bottom_right.0, bottom: bottom_right.1 }
    }

    /// Clip to a `width x height` frame. None when nothing of the ROI is inside.
    pub fn clip(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.left.clamp(0, width as i32);
        let y0 = self.top.clamp(0, height as i32);
        let x1 = self.right.clamp(0, width as i32);
        let y1 = self.bottom.clamp(0, height as i32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// Target color with a symmetric per-channel tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ColorProfile {
    pub color: [u8; 3],
    pub tolerance: u8,
    /// Smoothing kernel size, odd; 0 disables smoothing.
    #[serde(default)]
    pub blur: u32,
}

impl ColorProfile {
    pub const fn new(color: [u8; 3], tolerance: u8, blur: u32) -> Self {
        Self { color, tolerance, blur }
    }

    /// Inclusive per-channel test: `color - tol <= p <= color + tol`.
    #[inline]
    pub fn matches(&self, p: [u8; 3]) -> bool {
        (0..3).all(|i| {
            let lo = self.color[i].saturating_sub(self.tolerance);
            let hi = self.color[i].saturating_add(self.tolerance);
            lo <= p[i] && p[i] <= hi
        })
    }
}

/// Outcome of one localization call. Absence is a normal result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectionResult {
    pub found: bool,
    pub bbox: Option<BoundingBox>,
    /// Pixel count of the winning region (0 when nothing was found).
    pub area: u32,
    pub center: Option<Position2D>,
}

impl DetectionResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn hit(bbox: BoundingBox, area: u32) -> Self {
        Self { found: true, bbox: Some(bbox), area, center: Some(bbox.center()) }
    }
}
