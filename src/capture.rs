// Grabs the tracked window (or the whole desktop) and hands back an RGB frame.
// Visual expectation: when the session calls `capture()`, you get exactly the
// game's client area, title bar and borders already trimmed off.

use crate::error::Error;
use crate::types::Frame;
use image::{DynamicImage, RgbaImage};
use log::{debug, warn};
use std::time::Instant;

/// Produces one frame per call. Anything the OS hands out for the grab is
/// released before `capture` returns, on success and on error alike.
pub trait FrameSource {
    fn capture(&mut self, region: &CaptureRegion) -> Result<Frame, Error>;
}

/// Screen rectangle of a capture target, desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Part of the target image to keep, relative to the target's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    /// Whole target, nothing trimmed.
    pub fn full(bounds: &Bounds) -> Self {
        Self { x: 0, y: 0, width: bounds.width, height: bounds.height }
    }

    /// Window rectangle minus the title bar on top and `margin` on the other sides.
    /// None when the window is too small to leave anything.
    pub fn trimmed(bounds: &Bounds, title_bar: i32, margin: i32) -> Option<Self> {
        // (x1, y1, x2, y2) of the client area, inclusive size like the window rect math
        let x1 = margin;
        let y1 = title_bar;
        let x2 = bounds.width as i32 - margin;
        let y2 = bounds.height as i32 - margin;
        let width = x2 - x1 + 1;
        let height = y2 - y1 + 1;
        if x1 < 0 || y1 < 0 || width <= 0 || height <= 0 {
            return None;
        }
        Some(Self { x: x1 as u32, y: y1 as u32, width: width as u32, height: height as u32 })
    }
}

/// What we capture from: a specific window, or the primary monitor as fallback.
pub enum CaptureTarget {
    Window(xcap::Window),
    Desktop(xcap::Monitor),
}

impl CaptureTarget {
    /// First window whose title matches exactly.
    pub fn find_window(title: &str) -> Result<Option<Self>, Error> {
        let windows = xcap::Window::all()
            .map_err(|e| Error::Capture(format!("Enumerate windows: {e}")))?;
        let found = windows
            .into_iter()
            .find(|w| w.title().map(|t| t == title).unwrap_or(false));
        Ok(found.map(CaptureTarget::Window))
    }

    /// Primary monitor, or the first one if none is flagged primary.
    pub fn desktop() -> Result<Self, Error> {
        let monitors = xcap::Monitor::all()
            .map_err(|e| Error::CaptureUnavailable(format!("Enumerate monitors: {e}")))?;
        let mut first = None;
        for m in monitors {
            if m.is_primary().unwrap_or(false) {
                return Ok(CaptureTarget::Desktop(m));
            }
            first.get_or_insert(m);
        }
        first
            .map(CaptureTarget::Desktop)
            .ok_or_else(|| Error::CaptureUnavailable("No monitors found".into()))
    }

    pub fn bounds(&self) -> Result<Bounds, Error> {
        let lost = |e: xcap::XCapError| Error::CaptureUnavailable(format!("Read bounds: {e}"));
        let b = match self {
            CaptureTarget::Window(w) => Bounds {
                x: w.x().map_err(lost)?,
                y: w.y().map_err(lost)?,
                width: w.width().map_err(lost)?,
                height: w.height().map_err(lost)?,
            },
            CaptureTarget::Desktop(m) => Bounds {
                x: m.x().map_err(lost)?,
                y: m.y().map_err(lost)?,
                width: m.width().map_err(lost)?,
                height: m.height().map_err(lost)?,
            },
        };
        if b.width == 0 || b.height == 0 {
            return Err(Error::CaptureUnavailable(format!("Target has zero size: {b:?}")));
        }
        Ok(b)
    }

    pub fn is_foreground(&self) -> bool {
        match self {
            CaptureTarget::Window(w) => w.is_focused().unwrap_or(false),
            CaptureTarget::Desktop(_) => true,
        }
    }

    /// The capture backend cannot raise windows; we only report whether the
    /// user still has to click into it.
    pub fn bring_to_foreground(&self) {
        if !self.is_foreground() {
            warn!("target window is not focused; click into it before the countdown ends");
        }
    }

    /// Raw RGBA grab of the whole target.
    fn grab(&self) -> Result<RgbaImage, Error> {
        match self {
            CaptureTarget::Window(w) => {
                if w.is_minimized().unwrap_or(true) {
                    return Err(Error::CaptureUnavailable("Window is minimised or gone".into()));
                }
                w.capture_image()
                    .map_err(|e| Error::CaptureUnavailable(format!("Capture window: {e}")))
            }
            CaptureTarget::Desktop(m) => m
                .capture_image()
                .map_err(|e| Error::CaptureUnavailable(format!("Capture monitor: {e}"))),
        }
    }
}

/// Live screen capture of one target.
pub struct ScreenCapture {
    target: CaptureTarget,
}

impl ScreenCapture {
    pub fn new(target: CaptureTarget) -> Self {
        Self { target }
    }
}

impl FrameSource for ScreenCapture {
    fn capture(&mut self, region: &CaptureRegion) -> Result<Frame, Error> {
        let started = Instant::now();

        // 1) Grab RGBA from the OS (backend releases its device contexts before returning).
        let rgba = self.target.grab()?;

        // 2) Drop alpha; the vision code works on RGB only.
        let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

        // 3) Keep just the requested region.
        let frame = crop_region(&rgb, region)?;

        debug!(
            "captured {}x{} in {:.1} ms",
            frame.width(),
            frame.height(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(frame)
    }
}

/// Crop `region` out of a full-target image, clamped to the image.
pub fn crop_region(full: &Frame, region: &CaptureRegion) -> Result<Frame, Error> {
    if region.x >= full.width() || region.y >= full.height() {
        return Err(Error::Capture(format!(
            "Region {region:?} starts outside the {}x{} target image",
            full.width(),
            full.height()
        )));
    }
    Ok(image::imageops::crop_imm(full, region.x, region.y, region.width, region.height).to_image())
}
