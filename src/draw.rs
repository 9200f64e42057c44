// Debug window + software drawing utilities.
// Visual effects provided here:
// 1) A window that shows the masked game frame with detection boxes on top.
// 2) A crosshair at the reference point and a line to the primary marker.
// 3) A mask view (M) where each feature's mask is tinted in its own channel.
// 4) A tiny 5x7 bitmap font for the HUD line.

use crate::error::Error;
use crate::tracking::FrameAnalysis;
use crate::types::{BoundingBox, FrameBuffer, Position2D};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

const PRIMARY_COLOR: u32 = 0x00_00_FF_00;     // green box + line
const SECONDARY_COLOR: u32 = 0x00_00_80_FF;   // orange-blue box for aligned UI
const OBSTRUCTION_COLOR: u32 = 0x00_00_00_40; // dark blue boxes
const CROSSHAIR_COLOR: u32 = 0x00_FF_CC_33;
const HUD_COLOR: u32 = 0x00_FF_FF_FF;

pub struct Drawer {
    window: Window, // the on-screen debug window
}

impl Drawer {
    /// Create a window sized to the capture region.
    /// Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// True once the user asked to stop: window closed, Q or ESC held.
    pub fn abort_requested(&self) -> bool {
        !self.window.is_open()
            || self.window.is_key_down(Key::Escape)
            || self.window.is_key_down(Key::Q)
    }

    /// M flips between the overlay and the mask view.
    pub fn m_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::M, KeyRepeat::No)
    }
}

/// Build what the debug window shows for one analysed frame.
pub fn render(analysis: &FrameAnalysis, reference: Position2D, show_masks: bool, hud: &str) -> FrameBuffer {
    let mut fb = if show_masks {
        mask_composite(analysis)
    } else {
        FrameBuffer::from_frame(&analysis.masked)
    };

    if !show_masks {
        let r = &analysis.report;
        for region in &r.obstruction_regions {
            draw_rect(&mut fb, &region.bbox, OBSTRUCTION_COLOR);
        }
        for region in &r.aligned_secondary {
            draw_rect(&mut fb, &region.bbox, SECONDARY_COLOR);
        }
        if let (Some(b), Some(c)) = (r.primary.detection.bbox, r.primary.detection.center) {
            draw_rect(&mut fb, &b, PRIMARY_COLOR);
            draw_line(&mut fb, reference.x, reference.y, c.x, c.y, PRIMARY_COLOR);
        }
        draw_crosshair(&mut fb, reference.x, reference.y, 12, CROSSHAIR_COLOR);
    }

    draw_text_5x7(&mut fb, 8, 8, hud, HUD_COLOR);
    fb
}

/// Primary -> green, secondary -> green + blue, obstruction -> blue, doubled for visibility.
fn mask_composite(analysis: &FrameAnalysis) -> FrameBuffer {
    let [primary, secondary, obstruction] = &analysis.masks;
    let width = primary.width() as usize;
    let height = primary.height() as usize;
    let pixels = primary
        .as_raw()
        .iter()
        .zip(secondary.as_raw())
        .zip(obstruction.as_raw())
        .map(|((&p, &s), &o)| {
            let g = p.saturating_add(s).saturating_mul(2) as u32;
            let b = s.saturating_add(o).saturating_mul(2) as u32;
            (g << 8) | b
        })
        .collect();
    FrameBuffer { width, height, pixels }
}

/* ---------- Software drawing: pixels, lines, boxes, crosshair ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Draw a thin line between (x0,y0) and (x1,y1) using Bresenham.
fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0, x1, y1) = (x0, y0, x1, y1);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(fb, x0, y0, color);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// 2-pixel outline around a bounding box.
fn draw_rect(fb: &mut FrameBuffer, b: &BoundingBox, color: u32) {
    for t in 0..2 {
        let (x0, y0) = (b.x - t, b.y - t);
        let (x1, y1) = (b.x + b.w - 1 + t, b.y + b.h - 1 + t);
        draw_line(fb, x0, y0, x1, y0, color);
        draw_line(fb, x0, y1, x1, y1, color);
        draw_line(fb, x0, y0, x0, y1, color);
        draw_line(fb, x1, y0, x1, y1, color);
    }
}

/// Small crosshair centered at (cx,cy), with a gap in the middle.
fn draw_crosshair(fb: &mut FrameBuffer, cx: i32, cy: i32, size: i32, color: u32) {
    draw_line(fb, cx - size, cy, cx - 2, cy, color);
    draw_line(fb, cx + 2, cy, cx + size, cy, color);
    draw_line(fb, cx, cy - size, cx, cy - 2, color);
    draw_line(fb, cx, cy + 2, cx, cy + size, color);
    put_pixel(fb, cx, cy, color);
}

/* ---------- 5x7 bitmap font (just what the HUD prints) ---------- */

/// Return a 5x7 glyph bitmap for a limited character set.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b11001,0b10101,0b10011,0b10001,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b00110,0b00100,0b01000),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y), with a 1-pixel black shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    if let Some(rows) = glyph5x7(ch) {
        for (shift, c) in [(1, 0x00000000), (0, color)] {
            for (ry, rowbits) in rows.iter().enumerate() {
                for rx in 0..5 {
                    if (rowbits & (1 << (4 - rx))) != 0 {
                        put_pixel(fb, x + rx as i32 + shift, y + ry as i32 + shift, c);
                    }
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs; lowercase is drawn as uppercase.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch.to_ascii_uppercase(), color);
        x += 6; // 5 pixels glyph width + 1 pixel spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::tracking::FeatureTracker;
    use crate::types::Frame;

    fn blank(w: usize, h: usize) -> FrameBuffer {
        FrameBuffer { width: w, height: h, pixels: vec![0; w * h] }
    }

    #[test]
    fn drawing_off_screen_is_ignored() {
        let mut fb = blank(10, 10);
        draw_line(&mut fb, -20, -20, 30, 30, 0xFF);
        draw_crosshair(&mut fb, 100, 100, 12, 0xFF);
        assert_eq!(fb.pixels[0], 0xFF);
        assert_eq!(fb.pixels[99], 0xFF);
    }

    #[test]
    fn rect_outline_leaves_inside_untouched() {
        let mut fb = blank(20, 20);
        draw_rect(&mut fb, &BoundingBox { x: 5, y: 5, w: 10, h: 10 }, 0xAB);
        assert_eq!(fb.pixels[5 * 20 + 5], 0xAB);
        assert_eq!(fb.pixels[4 * 20 + 4], 0xAB);
        assert_eq!(fb.pixels[10 * 20 + 10], 0);
    }

    #[test]
    fn hud_glyphs_cover_what_the_session_prints() {
        for ch in "TAG 12,-3 | UI NO | OBS 360 | FPS: 39.8 | MASK".chars() {
            assert!(glyph5x7(ch).is_some(), "missing glyph {ch:?}");
        }
    }

    #[test]
    fn mask_view_tints_channels() {
        let mut config = Config::default();
        config.rois.clear();
        config.features.primary.profile.blur = 0;
        let mut frame = Frame::new(4, 4);
        frame.put_pixel(1, 1, image::Rgb([0, 215, 0]));
        let a = FeatureTracker::new(&config).analyze(&frame, Position2D::new(2, 2));
        let fb = mask_composite(&a);
        assert_eq!(fb.pixels[4 + 1], 0x00_00_FF_00);
        assert_eq!(fb.pixels[0], 0);
    }
}
