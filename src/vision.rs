// Per-frame pixel work: blank HUD panels, then color-key each feature into a mask.
// Everything here is pure: same frame + same settings => same output.

use crate::types::{ColorProfile, Frame, Mask, Roi, MASK_ON};

/// Return a copy of `frame` with every pixel inside any ROI set to black.
/// ROIs are clipped to the frame; one that misses the frame entirely does nothing.
pub fn apply_exclusions(frame: &Frame, rois: &[Roi]) -> Frame {
    let mut out = frame.clone();
    for roi in rois {
        let Some((x0, y0, x1, y1)) = roi.clip(out.width(), out.height()) else {
            continue;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                out.put_pixel(x, y, image::Rgb([0, 0, 0]));
            }
        }
    }
    out
}

/// Threshold `frame` against `profile` and optionally smooth the result.
/// Raw hits are MASK_ON; after smoothing any value > 0 is still foreground.
pub fn segment(frame: &Frame, profile: &ColorProfile) -> Mask {
    let mut mask = color_key(frame, profile);
    if profile.blur > 1 {
        mask = gaussian_blur(&mask, profile.blur as usize);
    }
    mask
}

/// Binary inclusive in-range test, one output byte per pixel.
pub fn color_key(frame: &Frame, profile: &ColorProfile) -> Mask {
    let (w, h) = frame.dimensions();
    let mut mask = Mask::new(w, h);
    for (src, dst) in frame.pixels().zip(mask.pixels_mut()) {
        if profile.matches(src.0) {
            dst.0[0] = MASK_ON;
        }
    }
    mask
}

/// 1-D Gaussian weights for an odd kernel size, summing to 1.
/// Sigma follows the usual "derive it from the size" rule: 0.3*((k-1)/2 - 1) + 0.8.
pub fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    let ksize = ksize.max(1) | 1; // force odd
    let r = (ksize / 2) as i32;
    let sigma = 0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let s2 = 2.0 * sigma * sigma;

    let mut k: Vec<f32> = (-r..=r).map(|i| (-((i * i) as f32) / s2).exp()).collect();
    let sum: f32 = k.iter().sum();
    for w in &mut k { *w /= sum; }
    k
}

/// Separable Gaussian smoothing of a mask with edge-extended borders.
pub fn gaussian_blur(src: &Mask, ksize: usize) -> Mask {
    let kernel = gaussian_kernel(ksize);
    let r = (kernel.len() / 2) as i32;
    let w = src.width() as i32;
    let h = src.height() as i32;
    if w == 0 || h == 0 {
        return src.clone();
    }
    let data = src.as_raw();

    /* ---- Pass 1: horizontal into a float scratch row-major buffer ---- */
    let mut tmp = vec![0f32; (w * h) as usize];
    for y in 0..h {
        let row = (y * w) as usize;
        for x in 0..w {
            let mut acc = 0f32;
            for (ki, kw) in kernel.iter().enumerate() {
                let sx = (x + ki as i32 - r).clamp(0, w - 1) as usize; // extend edges
                acc += *kw * data[row + sx] as f32;
            }
            tmp[row + x as usize] = acc;
        }
    }

    /* ---- Pass 2: vertical, rounded back to u8 ---- */
    let mut out = Mask::new(src.width(), src.height());
    let buf: &mut [u8] = &mut out;
    for x in 0..w {
        for y in 0..h {
            let mut acc = 0f32;
            for (ki, kw) in kernel.iter().enumerate() {
                let sy = (y + ki as i32 - r).clamp(0, h - 1);
                acc += *kw * tmp[(sy * w + x) as usize];
            }
            buf[(y * w + x) as usize] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(w: u32, h: u32, c: [u8; 3]) -> Frame {
        Frame::from_pixel(w, h, Rgb(c))
    }

    #[test]
    fn mask_matches_inclusive_range_for_every_channel_value() {
        let profile = ColorProfile::new([40, 210, 240], 35, 0);
        // Sweep one channel at a time across the full byte range.
        for ch in 0..3 {
            let mut frame = Frame::new(256, 1);
            for v in 0..=255u32 {
                let mut p = profile.color;
                p[ch] = v as u8;
                frame.put_pixel(v, 0, Rgb(p));
            }
            let mask = color_key(&frame, &profile);
            for v in 0..=255i32 {
                let c = profile.color[ch] as i32;
                let t = profile.tolerance as i32;
                let expect = c - t <= v && v <= c + t;
                assert_eq!(mask.get_pixel(v as u32, 0).0[0] > 0, expect, "channel {ch} value {v}");
            }
        }
    }

    #[test]
    fn roi_outside_frame_leaves_it_unchanged() {
        let frame = solid(32, 16, [9, 8, 7]);
        let out = apply_exclusions(&frame, &[Roi::new((40, 0), (60, 10)), Roi::new((-10, -10), (0, 5))]);
        assert_eq!(out, frame);
    }

    #[test]
    fn overlapping_rois_blank_their_union_only() {
        let frame = solid(10, 10, [200, 200, 200]);
        let rois = [Roi::new((0, 0), (4, 4)), Roi::new((2, 2), (6, 6)), Roi::new((2, 2), (6, 6))];
        let out = apply_exclusions(&frame, &rois);
        for (x, y, p) in out.enumerate_pixels() {
            let inside = (x < 4 && y < 4) || ((2..6).contains(&x) && (2..6).contains(&y));
            assert_eq!(p.0 == [0, 0, 0], inside, "({x},{y})");
        }
        // Input untouched.
        assert_eq!(frame.get_pixel(1, 1).0, [200, 200, 200]);
    }

    #[test]
    fn roi_partially_outside_is_clipped() {
        let frame = solid(8, 8, [1, 2, 3]);
        let out = apply_exclusions(&frame, &[Roi::new((6, 6), (100, 100))]);
        assert_eq!(out.get_pixel(7, 7).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(5, 7).0, [1, 2, 3]);
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(25);
        assert_eq!(k.len(), 25);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..12 {
            assert!((k[i] - k[24 - i]).abs() < 1e-7);
        }
        assert!(k[12] > k[11]);
    }

    #[test]
    fn blur_merges_nearby_speckles_and_keeps_far_background_empty() {
        let mut frame = solid(40, 20, [0, 0, 0]);
        frame.put_pixel(10, 10, Rgb([0, 215, 0]));
        frame.put_pixel(12, 10, Rgb([0, 215, 0]));

        let raw = segment(&frame, &ColorProfile::new([0, 215, 0], 40, 0));
        assert_eq!(raw.get_pixel(11, 10).0[0], 0);

        let soft = segment(&frame, &ColorProfile::new([0, 215, 0], 40, 5));
        assert!(soft.get_pixel(11, 10).0[0] > 0);
        assert_eq!(soft.get_pixel(35, 10).0[0], 0);
    }

    #[test]
    fn segmentation_is_deterministic() {
        let mut frame = solid(16, 16, [0, 0, 0]);
        for x in 3..9 {
            frame.put_pixel(x, 5, Rgb([54, 158, 198]));
        }
        let p = ColorProfile::new([54, 158, 198], 30, 7);
        assert_eq!(segment(&frame, &p), segment(&frame, &p));
    }
}
