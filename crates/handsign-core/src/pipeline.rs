//! Local gesture pipeline.
//!
//! Stages run strictly in sequence on whole frames:
//! gray-world compensation → YCbCr → skin mask → opening → metrics /
//! contour / radial peaks → classification.

use serde::{Deserialize, Serialize};

use crate::classify::{GestureLabel, classify};
use crate::color::illumination::{ChannelGains, compensate};
use crate::color::planes::to_ycbcr;
use crate::error::AnalysisError;
use crate::image::{Mask, Point, RgbImage};
use crate::params::PipelineParams;
use crate::segmentation::{morphology, skin};
use crate::shape::contour::{self, Contour};
use crate::shape::metrics::{self, Metrics};
use crate::shape::radial::{self, Peak};

/// Outcome of classifying one frame, shared by the local and accelerator
/// paths so the two can be compared field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReport {
    pub area: u32,
    pub perimeter: u32,
    pub peak_count: u32,
    pub label: GestureLabel,
    /// Why the frame degraded to `Unrecognized`, when analysis failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<AnalysisError>,
}

impl FrameReport {
    /// Build a report from the accelerator's four result registers.
    pub fn from_registers(area: u32, perimeter: u32, peak_count: u32, code: u32) -> Self {
        Self {
            area,
            perimeter,
            peak_count,
            label: GestureLabel::from_code(code),
            failure: None,
        }
    }
}

/// Every intermediate product of a successful local run.
#[derive(Debug, Clone)]
pub struct HandAnalysis {
    pub gains: ChannelGains,
    pub mask: Mask,
    pub metrics: Metrics,
    pub reference: Point,
    pub contour: Contour,
    pub distances: Vec<f64>,
    pub peaks: Vec<Peak>,
    pub label: GestureLabel,
}

impl HandAnalysis {
    pub fn report(&self) -> FrameReport {
        FrameReport {
            area: self.metrics.area,
            perimeter: self.metrics.perimeter,
            peak_count: self.peaks.len() as u32,
            label: self.label,
            failure: None,
        }
    }
}

/// Compensate, convert, threshold and open: the binary hand mask.
pub fn segment_hand(image: &RgbImage, params: &PipelineParams) -> (Mask, ChannelGains) {
    let (balanced, gains) = compensate(image);
    let ycc = to_ycbcr(&balanced);
    let raw = skin::segment(&ycc, &params.skin);
    (morphology::open(&raw), gains)
}

struct Boundary {
    reference: Point,
    contour: Contour,
    distances: Vec<f64>,
    peaks: Vec<Peak>,
}

fn analyze_boundary(mask: &Mask, params: &PipelineParams) -> Result<Boundary, AnalysisError> {
    let contour = contour::trace(mask)?;
    let reference = metrics::base_reference(mask).ok_or(AnalysisError::NoBoundary)?;
    let distances = radial::radial_distances(&contour, reference);
    let peaks = radial::detect_peaks(&distances, &params.peaks)?;
    Ok(Boundary {
        reference,
        contour,
        distances,
        peaks,
    })
}

/// Output of every stage up to classification. Boundary analysis is the
/// only stage that can fail.
struct Stages {
    gains: ChannelGains,
    mask: Mask,
    metrics: Metrics,
    outcome: Result<(Boundary, GestureLabel), AnalysisError>,
}

fn run_stages(image: &RgbImage, params: &PipelineParams) -> Stages {
    let (mask, gains) = segment_hand(image, params);
    let metrics = metrics::measure(&mask);
    let outcome = analyze_boundary(&mask, params).map(|boundary| {
        let label = classify(
            metrics.area,
            metrics.perimeter,
            boundary.peaks.len() as u32,
            &params.classifier,
        );
        (boundary, label)
    });
    Stages {
        gains,
        mask,
        metrics,
        outcome,
    }
}

/// Run the whole pipeline, stopping at the first analysis failure.
pub fn try_analyze(image: &RgbImage, params: &PipelineParams) -> Result<HandAnalysis, AnalysisError> {
    let Stages {
        gains,
        mask,
        metrics,
        outcome,
    } = run_stages(image, params);
    let (boundary, label) = outcome?;
    Ok(HandAnalysis {
        gains,
        mask,
        metrics,
        reference: boundary.reference,
        contour: boundary.contour,
        distances: boundary.distances,
        peaks: boundary.peaks,
        label,
    })
}

/// Classify a frame. Boundary and signal failures are recorded in the
/// report and yield `Unrecognized`; they never escape to the caller.
pub fn analyze(image: &RgbImage, params: &PipelineParams) -> FrameReport {
    analyze_with_mask(image, params).0
}

/// [`analyze`], also handing back the opened hand mask the metrics were
/// measured on.
pub fn analyze_with_mask(image: &RgbImage, params: &PipelineParams) -> (FrameReport, Mask) {
    let Stages {
        mask,
        metrics: Metrics { area, perimeter },
        outcome,
        ..
    } = run_stages(image, params);

    let report = match outcome {
        Ok((boundary, label)) => {
            let peak_count = boundary.peaks.len() as u32;
            tracing::debug!(
                area,
                perimeter,
                peak_count,
                contour_len = boundary.contour.len(),
                reference = %boundary.reference,
                "frame classified as {label}"
            );
            FrameReport {
                area,
                perimeter,
                peak_count,
                label,
                failure: None,
            }
        }
        Err(e) => {
            tracing::warn!(area, perimeter, "frame not classified: {e}");
            FrameReport {
                area,
                perimeter,
                peak_count: 0,
                label: GestureLabel::Unrecognized,
                failure: Some(e),
            }
        }
    };
    (report, mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_frame_degrades_to_unrecognized() {
        let img = RgbImage::from_fn(32, 24, |_, _| [60, 60, 60]);
        let report = analyze(&img, &PipelineParams::default());
        assert_eq!(report.label, GestureLabel::Unrecognized);
        assert_eq!(report.failure, Some(AnalysisError::NoBoundary));
        assert_eq!((report.area, report.perimeter, report.peak_count), (0, 0, 0));
        assert_eq!(
            try_analyze(&img, &PipelineParams::default()).unwrap_err(),
            AnalysisError::NoBoundary
        );
    }

    #[test]
    fn test_report_and_analysis_agree() {
        // Skin-toned block resting on the bottom edge.
        let img = RgbImage::from_fn(64, 48, |r, c| {
            if r >= 30 && (24..40).contains(&c) {
                [200, 140, 110]
            } else {
                [60, 60, 60]
            }
        });
        let params = PipelineParams::default();
        let (report, mask) = analyze_with_mask(&img, &params);
        let analysis = try_analyze(&img, &params).unwrap();

        assert_eq!(report, analysis.report());
        assert_eq!(report, analyze(&img, &params));
        assert_eq!(mask, analysis.mask);
        assert_eq!(mask, segment_hand(&img, &params).0);
        assert!(report.area > 0);
    }

    #[test]
    fn test_registers_decode_into_report() {
        let report = FrameReport::from_registers(8652, 460, 2, 2);
        assert_eq!(report.label, GestureLabel::Victory);
        assert!(report.failure.is_none());
    }
}
