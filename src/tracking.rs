// Per-iteration feature tracking.
// Visual expectation: for each frame you get the name tag, its paired UI border
// and the cover silhouette, each as an offset from the middle of the frame.

use crate::config::{Config, FeatureSpec};
use crate::regions::{self, Region};
use crate::types::{DetectionResult, Frame, Mask, Offset, Position2D};
use crate::vision;

/// Reference point for offsets: the middle of the frame.
pub fn frame_center(frame: &Frame) -> Position2D {
    Position2D::new((frame.width() / 2) as i32, (frame.height() / 2) as i32)
}

/// `center(detection.bbox) - reference`, or None when nothing was found.
pub fn offset_from(detection: &DetectionResult, reference: Position2D) -> Option<Offset> {
    detection.center.filter(|_| detection.found).map(|c| c - reference)
}

/// Secondary marker belongs to the primary one when their horizontal offsets
/// differ by strictly less than `threshold` pixels.
pub fn is_aligned(primary: Offset, secondary: Offset, threshold: i32) -> bool {
    (primary.dx - secondary.dx).abs() < threshold
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureReport {
    pub detection: DetectionResult,
    pub offset: Option<Offset>,
}

impl FeatureReport {
    fn new(detection: DetectionResult, reference: Position2D) -> Self {
        Self { detection, offset: offset_from(&detection, reference) }
    }
}

/// What one frame told us. Rebuilt from scratch every iteration.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub primary: FeatureReport,
    /// Primary offset shifted down to where the body sits under the marker.
    pub aim: Option<Offset>,
    /// Best secondary candidate aligned with the primary marker.
    pub secondary: FeatureReport,
    pub obstruction: FeatureReport,
    /// Every secondary region that passed the alignment test.
    pub aligned_secondary: Vec<Region>,
    /// Every obstruction-colored region (debug drawing only).
    pub obstruction_regions: Vec<Region>,
}

/// Report plus the intermediate images, kept for the debug overlay.
pub struct FrameAnalysis {
    pub report: FrameReport,
    pub masked: Frame,
    pub masks: [Mask; 3], // primary, secondary, obstruction
}

pub struct FeatureTracker<'a> {
    config: &'a Config,
}

impl<'a> FeatureTracker<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn analyze(&self, frame: &Frame, reference: Position2D) -> FrameAnalysis {
        let features = &self.config.features;
        let masked = vision::apply_exclusions(frame, &self.config.rois);

        /* 1) Primary marker: largest region over the area gate. */
        let primary_mask = vision::segment(&masked, &features.primary.profile);
        let primary = FeatureReport::new(
            regions::locate(&primary_mask, features.primary.min_area),
            reference,
        );
        let aim = primary.offset.map(|o| Offset { dx: o.dx, dy: o.dy + self.config.tracking.aim_drop_px });

        /* 2) Secondary marker: only regions horizontally aligned with the primary count. */
        let secondary_mask = vision::segment(&masked, &features.secondary.profile);
        let aligned_secondary = match primary.offset {
            Some(p) => self.aligned_candidates(&secondary_mask, &features.secondary, p, reference),
            None => Vec::new(),
        };
        let secondary = FeatureReport::new(
            regions::largest(&aligned_secondary)
                .map(|r| DetectionResult::hit(r.bbox, r.area))
                .unwrap_or_default(),
            reference,
        );

        /* 3) Obstruction marker: largest region, all regions kept for drawing. */
        let obstruction_mask = vision::segment(&masked, &features.obstruction.profile);
        let obstruction_regions = regions::find_regions(&obstruction_mask);
        let obstruction_hit = match regions::largest(&obstruction_regions) {
            Some(r) if r.area >= features.obstruction.min_area => DetectionResult::hit(r.bbox, r.area),
            _ => DetectionResult::none(),
        };
        let obstruction = FeatureReport::new(obstruction_hit, reference);

        FrameAnalysis {
            report: FrameReport { primary, aim, secondary, obstruction, aligned_secondary, obstruction_regions },
            masked,
            masks: [primary_mask, secondary_mask, obstruction_mask],
        }
    }

    fn aligned_candidates(
        &self,
        mask: &Mask,
        feature: &FeatureSpec,
        primary: Offset,
        reference: Position2D,
    ) -> Vec<Region> {
        let threshold = self.config.tracking.align_threshold_px;
        regions::find_regions(mask)
            .into_iter()
            .filter(|r| r.area >= feature.min_area)
            .filter(|r| is_aligned(primary, r.bbox.center() - reference, threshold))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn paint(frame: &mut Frame, x: u32, y: u32, w: u32, h: u32, c: [u8; 3]) {
        for yy in y..y + h {
            for xx in x..x + w {
                frame.put_pixel(xx, yy, Rgb(c));
            }
        }
    }

    fn unblurred() -> Config {
        let mut c = Config::default();
        c.features.primary.profile.blur = 0;
        c.features.secondary.profile.blur = 0;
        c.features.obstruction.profile.blur = 0;
        c.rois.clear();
        c
    }

    #[test]
    fn alignment_uses_strict_horizontal_threshold() {
        let primary = Offset { dx: 5, dy: 20 };
        assert!(!is_aligned(primary, Offset { dx: 40, dy: -3 }, 10));
        assert!(is_aligned(primary, Offset { dx: 8, dy: -3 }, 10));
        assert!(!is_aligned(primary, Offset { dx: 15, dy: 0 }, 10));
        assert!(is_aligned(primary, Offset { dx: -4, dy: 0 }, 10));
    }

    #[test]
    fn reference_is_frame_middle() {
        assert_eq!(frame_center(&Frame::new(1025, 577)), Position2D::new(512, 288));
    }

    #[test]
    fn offset_is_center_minus_reference() {
        let d = DetectionResult::hit(crate::types::BoundingBox { x: 10, y: 10, w: 10, h: 20 }, 200);
        assert_eq!(offset_from(&d, Position2D::new(50, 50)), Some(Offset { dx: -35, dy: -30 }));
        assert_eq!(offset_from(&DetectionResult::none(), Position2D::new(0, 0)), None);
    }

    #[test]
    fn full_frame_analysis_finds_all_three_features() {
        let config = unblurred();
        let mut frame = Frame::new(400, 300);
        paint(&mut frame, 230, 100, 20, 15, [0, 215, 0]);      // primary, center (240,107)
        paint(&mut frame, 232, 60, 14, 4, [40, 210, 240]);     // aligned UI, center (239,62)
        paint(&mut frame, 20, 20, 10, 4, [40, 210, 240]);      // unrelated UI
        paint(&mut frame, 300, 200, 12, 30, [54, 158, 198]);   // obstruction

        let reference = Position2D::new(200, 150);
        let a = FeatureTracker::new(&config).analyze(&frame, reference);
        let r = &a.report;

        assert!(r.primary.detection.found);
        assert_eq!(r.primary.offset, Some(Offset { dx: 40, dy: -43 }));
        assert_eq!(r.aim, Some(Offset { dx: 40, dy: 37 }));

        assert!(r.secondary.detection.found);
        assert_eq!(r.aligned_secondary.len(), 1);
        assert_eq!(r.secondary.offset, Some(Offset { dx: 39, dy: -88 }));

        assert!(r.obstruction.detection.found);
        assert_eq!(r.obstruction.detection.area, 360);
        assert_eq!(r.obstruction_regions.len(), 1);
    }

    fn two_aligned_borders() -> Frame {
        let mut frame = Frame::new(400, 300);
        paint(&mut frame, 230, 100, 20, 15, [0, 215, 0]);   // primary, center (240,107)
        paint(&mut frame, 233, 60, 14, 4, [40, 210, 240]);  // small UI, center (240,62), area 56
        paint(&mut frame, 230, 75, 20, 6, [40, 210, 240]);  // large UI, center (240,78), area 120
        frame
    }

    #[test]
    fn largest_aligned_secondary_wins() {
        let config = unblurred();
        let r = FeatureTracker::new(&config).analyze(&two_aligned_borders(), Position2D::new(200, 150)).report;
        assert_eq!(r.aligned_secondary.len(), 2);
        assert_eq!(r.secondary.detection.area, 120);
        assert_eq!(r.secondary.offset, Some(Offset { dx: 40, dy: -72 }));
    }

    #[test]
    fn aligned_secondary_under_min_area_is_ignored() {
        let mut config = unblurred();
        config.features.secondary.min_area = 100;
        let tracker = FeatureTracker::new(&config);
        let r = tracker.analyze(&two_aligned_borders(), Position2D::new(200, 150)).report;
        assert_eq!(r.aligned_secondary.len(), 1);
        assert_eq!(r.secondary.detection.area, 120);

        config.features.secondary.min_area = 150;
        let r = FeatureTracker::new(&config).analyze(&two_aligned_borders(), Position2D::new(200, 150)).report;
        assert!(r.aligned_secondary.is_empty());
        assert!(!r.secondary.detection.found);
        assert_eq!(r.secondary.offset, None);
    }

    #[test]
    fn secondary_needs_a_primary_to_align_with() {
        let config = unblurred();
        let mut frame = Frame::new(200, 200);
        paint(&mut frame, 90, 40, 20, 5, [40, 210, 240]);
        let r = FeatureTracker::new(&config).analyze(&frame, Position2D::new(100, 100)).report;
        assert!(!r.primary.detection.found);
        assert!(!r.secondary.detection.found);
        assert!(r.aim.is_none());
    }

    #[test]
    fn hud_rois_hide_matching_colors() {
        let mut config = unblurred();
        config.rois = vec![crate::types::Roi::new((0, 0), (100, 100))];
        let mut frame = Frame::new(200, 200);
        paint(&mut frame, 10, 10, 30, 30, [0, 215, 0]);
        let r = FeatureTracker::new(&config).analyze(&frame, Position2D::new(100, 100)).report;
        assert!(!r.primary.detection.found);
    }
}
