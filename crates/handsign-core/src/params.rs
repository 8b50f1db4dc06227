//! Tunable constants of the gesture pipeline.
//!
//! `PipelineParams` collects every threshold the local path reads. The
//! defaults are the calibrated domain constants shared with the
//! accelerator; overriding them breaks numeric parity with the hardware.

use serde::{Deserialize, Serialize};

/// Inclusive chroma bounds for skin classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinThresholds {
    /// Blue-difference bounds `[lo, hi]`. Default: `[95, 120]`.
    pub cb: [u8; 2],
    /// Red-difference bounds `[lo, hi]`. Default: `[140, 170]`.
    pub cr: [u8; 2],
}

impl Default for SkinThresholds {
    fn default() -> Self {
        Self {
            cb: [95, 120],
            cr: [140, 170],
        }
    }
}

/// Radial peak detection settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakParams {
    /// Fraction of the maximum distance a peak must exceed. Default: 0.715.
    pub threshold_ratio: f64,
    /// Minimum index distance between accepted peaks (exclusive). Default: 10.
    pub min_gap: usize,
}

impl Default for PeakParams {
    fn default() -> Self {
        Self {
            threshold_ratio: 0.715,
            min_gap: 10,
        }
    }
}

/// Normalization constants fitted to a 320×240 frame and the
/// raster-transition perimeter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// Area divisor. Default: 14400.
    pub area_norm: f64,
    /// Perimeter divisor. Default: 760.
    pub perimeter_norm: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            area_norm: 14400.0,
            perimeter_norm: 760.0,
        }
    }
}

/// All pipeline settings. Missing fields fall back to their defaults when
/// deserializing, so partial JSON overrides are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    pub skin: SkinThresholds,
    pub peaks: PeakParams,
    pub classifier: ClassifierParams,
}

impl PipelineParams {
    /// Parse parameters from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
