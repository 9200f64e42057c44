// Tunable constants, gathered into one value built once at start-up.
// Visual expectation: with no config file the tool behaves as calibrated for a
// 1024x576 client area; a JSON file may override any subset of fields.

use crate::error::Error;
use crate::types::{ColorProfile, Roi};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub features: FeatureSet,
    /// HUD panels blanked before any color test.
    pub rois: Vec<Roi>,
    pub tracking: TrackingConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Exact title of the window to track.
    pub title: String,
    /// Pixels trimmed off the top of the window rectangle.
    pub title_bar_height: i32,
    /// Pixels trimmed off the left, right and bottom edges.
    pub margin_width: i32,
    pub countdown_secs: u64,
}

/// Color + area gate for one tracked feature.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeatureSpec {
    pub profile: ColorProfile,
    pub min_area: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureSet {
    /// Marker floating above the target.
    pub primary: FeatureSpec,
    /// UI border that belongs to the primary marker when horizontally aligned.
    pub secondary: FeatureSpec,
    /// Silhouette color drawn when the target is behind cover.
    pub obstruction: FeatureSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Max horizontal disagreement (exclusive) between primary and secondary offsets.
    pub align_threshold_px: i32,
    /// How far below the primary marker the aim point sits.
    pub aim_drop_px: i32,
    /// Fixed delay at the end of every iteration.
    pub frame_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Pointer pixels per degree of yaw at sensitivity 1.0.
    pub yaw_ratio: f64,
    /// Pointer pixels per degree of pitch at sensitivity 1.0.
    pub pitch_ratio: f64,
    pub sensitivity: f64,
    /// Pause after each half of the recentering sequence.
    pub reset_pause_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            features: FeatureSet::default(),
            rois: vec![
                Roi::new((20, 454), (240, 560)),  // avatar panel
                Roi::new((455, 440), (575, 560)), // ultimate meter
                Roi::new((780, 470), (1010, 560)), // ability panel
            ],
            tracking: TrackingConfig::default(),
            view: ViewConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Overwatch".into(),
            title_bar_height: 32,
            margin_width: 9,
            countdown_secs: 3,
        }
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            primary: FeatureSpec { profile: ColorProfile::new([0, 215, 0], 40, 25), min_area: 200 },
            secondary: FeatureSpec { profile: ColorProfile::new([40, 210, 240], 35, 21), min_area: 1 },
            obstruction: FeatureSpec { profile: ColorProfile::new([54, 158, 198], 30, 25), min_area: 1 },
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { align_threshold_px: 10, aim_drop_px: 80, frame_delay_ms: 25 }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self { yaw_ratio: 1.515, pitch_ratio: 1.500, sensitivity: 0.15, reset_pause_ms: 50 }
    }
}

impl Config {
    /// Read a JSON override file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)
            .map_err(|e| Error::Config(format!("open {}: {e}", path.display())))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Config(format!("parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        for (name, f) in [
            ("primary", &self.features.primary),
            ("secondary", &self.features.secondary),
            ("obstruction", &self.features.obstruction),
        ] {
            if f.profile.blur != 0 && f.profile.blur % 2 == 0 {
                return Err(Error::Config(format!(
                    "{name}: blur kernel must be 0 or odd, got {}",
                    f.profile.blur
                )));
            }
        }
        for r in &self.rois {
            if r.right < r.left || r.bottom < r.top {
                return Err(Error::Config(format!("inverted ROI {r:?}")));
            }
        }
        if !(self.view.sensitivity > 0.0) {
            return Err(Error::Config(format!(
                "sensitivity must be positive, got {}",
                self.view.sensitivity
            )));
        }
        if self.tracking.align_threshold_px < 0 {
            return Err(Error::Config("align_threshold_px must be >= 0".into()));
        }
        Ok(())
    }
}
