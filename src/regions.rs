// Connected-region extraction on a detection mask and "largest wins" selection.
// Only outer regions are reported: anything sitting inside another region's hole
// is counted as part of that region, never on its own.

use crate::types::{BoundingBox, DetectionResult, Mask};
use std::collections::VecDeque;

/// One external region of a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub bbox: BoundingBox,
    /// Foreground pixels inside the region's outer boundary.
    pub area: u32,
}

const N4: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const N8: [(i32, i32); 8] = [(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (1, -1), (-1, 1), (-1, -1)];

/// All external regions, ordered by the raster position of their first pixel.
pub fn find_regions(mask: &Mask) -> Vec<Region> {
    let w = mask.width() as i32;
    let h = mask.height() as i32;
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let fg: Vec<bool> = mask.as_raw().iter().map(|&v| v > 0).collect();
    let idx = |x: i32, y: i32| (y * w + x) as usize;

    /* 1) Background reachable from the border (4-connected, dual of 8-connected fg). */
    let mut outside = vec![false; fg.len()];
    let mut queue = VecDeque::new();
    for y in 0..h {
        for x in 0..w {
            let on_border = x == 0 || y == 0 || x == w - 1 || y == h - 1;
            if on_border && !fg[idx(x, y)] && !outside[idx(x, y)] {
                outside[idx(x, y)] = true;
                queue.push_back((x, y));
            }
        }
    }
    while let Some((x, y)) = queue.pop_front() {
        for (dx, dy) in N4 {
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || ny < 0 || nx >= w || ny >= h { continue; }
            let n = idx(nx, ny);
            if !fg[n] && !outside[n] {
                outside[n] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    /* 2) Label "foreground or hole" with 8-connectivity; each label is one outer boundary. */
    let mut seen = vec![false; fg.len()];
    let mut regions = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let start = idx(x, y);
            if outside[start] || seen[start] { continue; }

            seen[start] = true;
            queue.push_back((x, y));
            let (mut x0, mut y0, mut x1, mut y1) = (x, y, x, y);
            let mut area = 0u32;

            while let Some((cx, cy)) = queue.pop_front() {
                if fg[idx(cx, cy)] { area += 1; }
                x0 = x0.min(cx); x1 = x1.max(cx);
                y0 = y0.min(cy); y1 = y1.max(cy);
                for (dx, dy) in N8 {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if nx < 0 || ny < 0 || nx >= w || ny >= h { continue; }
                    let n = idx(nx, ny);
                    if !outside[n] && !seen[n] {
                        seen[n] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }

            // Degenerate (no foreground at all) regions are dropped here.
            if area == 0 { continue; }
            regions.push(Region {
                bbox: BoundingBox { x: x0, y: y0, w: x1 - x0 + 1, h: y1 - y0 + 1 },
                area,
            });
        }
    }
    regions
}

/// First region with the strictly largest area.
pub fn largest(regions: &[Region]) -> Option<Region> {
    let mut best: Option<Region> = None;
    for r in regions {
        if best.is_none_or(|b| r.area > b.area) {
            best = Some(*r);
        }
    }
    best
}

/// Largest region of the mask, gated by `min_area` (inclusive).
/// Below the gate, or on an empty mask, the result is "not found".
pub fn locate(mask: &Mask, min_area: u32) -> DetectionResult {
    match largest(&find_regions(mask)) {
        Some(r) if r.area >= min_area => DetectionResult::hit(r.bbox, r.area),
        _ => DetectionResult::none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MASK_ON;
    use image::Luma;

    fn fill(mask: &mut Mask, x: u32, y: u32, w: u32, h: u32) {
        for yy in y..y + h {
            for xx in x..x + w {
                mask.put_pixel(xx, yy, Luma([MASK_ON]));
            }
        }
    }

    #[test]
    fn picks_the_larger_of_two_regions() {
        let mut m = Mask::new(200, 120);
        fill(&mut m, 5, 5, 20, 25);     // 500 px
        fill(&mut m, 100, 50, 30, 40);  // 1200 px

        let d = locate(&m, 200);
        assert!(d.found);
        assert_eq!(d.area, 1200);
        assert_eq!(d.bbox, Some(BoundingBox { x: 100, y: 50, w: 30, h: 40 }));
        assert_eq!(d.center.map(|c| (c.x, c.y)), Some((115, 70)));
    }

    #[test]
    fn region_below_gate_is_not_found() {
        let mut m = Mask::new(64, 64);
        fill(&mut m, 10, 10, 15, 10); // 150 px
        let d = locate(&m, 200);
        assert!(!d.found);
        assert_eq!(d.bbox, None);
        assert_eq!(d.center, None);
    }

    #[test]
    fn area_equal_to_gate_passes() {
        let mut m = Mask::new(64, 64);
        fill(&mut m, 0, 0, 20, 10);
        assert!(locate(&m, 200).found);
    }

    #[test]
    fn empty_mask_is_not_found() {
        assert!(!locate(&Mask::new(16, 16), 0).found);
        assert!(find_regions(&Mask::new(0, 0)).is_empty());
    }

    #[test]
    fn area_counts_pixels_not_box() {
        // An L shape: box is 10x10, pixels are 10 + 9.
        let mut m = Mask::new(20, 20);
        fill(&mut m, 2, 2, 10, 1);
        fill(&mut m, 2, 3, 1, 9);
        let r = find_regions(&m);
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].area, 19);
        assert_eq!(r[0].bbox, BoundingBox { x: 2, y: 2, w: 10, h: 10 });
    }

    #[test]
    fn diagonal_neighbours_join() {
        let mut m = Mask::new(8, 8);
        m.put_pixel(1, 1, Luma([MASK_ON]));
        m.put_pixel(2, 2, Luma([MASK_ON]));
        assert_eq!(find_regions(&m).len(), 1);
    }

    #[test]
    fn island_inside_a_ring_is_not_reported_separately() {
        let mut m = Mask::new(30, 30);
        fill(&mut m, 5, 5, 20, 1);
        fill(&mut m, 5, 24, 20, 1);
        fill(&mut m, 5, 5, 1, 20);
        fill(&mut m, 24, 5, 1, 20);
        fill(&mut m, 13, 13, 4, 4); // island in the hole

        let r = find_regions(&m);
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].bbox, BoundingBox { x: 5, y: 5, w: 20, h: 20 });
        assert_eq!(r[0].area, 76 + 16);
    }

    #[test]
    fn ties_go_to_the_first_region_in_raster_order() {
        let mut m = Mask::new(50, 50);
        fill(&mut m, 30, 2, 5, 5);
        fill(&mut m, 2, 30, 5, 5);
        let d = locate(&m, 1);
        assert_eq!(d.area, 25);
        assert_eq!(d.bbox.map(|b| (b.x, b.y)), Some((30, 2)));
    }

    #[test]
    fn soft_mask_values_count_as_foreground() {
        let mut m = Mask::new(10, 10);
        m.put_pixel(4, 4, Luma([1]));
        assert_eq!(locate(&m, 1).area, 1);
    }
}
