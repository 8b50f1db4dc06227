//! Radial distance signal and finger-peak detection.
//!
//! Each contour point's distance to the base reference (the middle of the
//! wrist line) forms a 1-D signal along the boundary. Raised fingers show
//! up as tall, well-separated local maxima.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::image::Point;
use crate::params::PeakParams;
use crate::shape::contour::Contour;

/// A local maximum of the distance signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Index into the contour / distance signal.
    pub index: usize,
    /// Distance at that index.
    pub value: f64,
}

/// Euclidean distance from every contour point to `reference`.
pub fn radial_distances(contour: &Contour, reference: Point) -> Vec<f64> {
    let origin = to_vec(reference);
    contour
        .points()
        .iter()
        .map(|&p| to_vec(p).distance(origin))
        .collect()
}

/// Debounced local-maxima scan.
///
/// Position `i − 1` is accepted when
/// - `d[i−2] ≤ d[i−1] ≥ d[i]` with at least one side strict (plateaus are
///   not peaks),
/// - `d[i−1] > threshold_ratio × max(d)`,
/// - and it lies more than `min_gap` indices after the last accepted peak.
///
/// Returns peaks in detection order.
pub fn detect_peaks(distances: &[f64], params: &PeakParams) -> Result<Vec<Peak>, AnalysisError> {
    let max = distances
        .iter()
        .copied()
        .reduce(f64::max)
        .ok_or(AnalysisError::EmptySignal)?;
    let threshold = params.threshold_ratio * max;

    let mut peaks: Vec<Peak> = Vec::new();
    for (i, window) in distances.windows(3).enumerate() {
        let [before, value, after] = [window[0], window[1], window[2]];
        let index = i + 1;

        let is_local_max = value >= before && value >= after && (value > before || value > after);
        if !is_local_max || value <= threshold {
            continue;
        }
        if peaks
            .last()
            .is_some_and(|last| index - last.index <= params.min_gap)
        {
            continue;
        }
        peaks.push(Peak { index, value });
    }

    tracing::trace!(count = peaks.len(), threshold, "radial peaks");
    Ok(peaks)
}

fn to_vec(p: Point) -> DVec2 {
    DVec2::new(p.col as f64, p.row as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `count` unit-height triangles of half-width `half`, one every `spacing`
    /// samples, on a zero baseline.
    fn pulses(count: usize, half: usize, spacing: usize) -> Vec<f64> {
        let len = spacing * count + 2 * half + 2;
        let mut signal = vec![0.0; len];
        for k in 0..count {
            let center = half + 1 + k * spacing;
            for j in 0..=half {
                let v = 1.0 - j as f64 / half as f64;
                signal[center - j] = f64::max(signal[center - j], v);
                signal[center + j] = f64::max(signal[center + j], v);
            }
        }
        signal
    }

    #[test]
    fn test_separated_pulses_each_yield_a_peak() {
        let signal = pulses(4, 4, 15);
        let peaks = detect_peaks(&signal, &PeakParams::default()).unwrap();
        let indices: Vec<usize> = peaks.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![5, 20, 35, 50]);
        assert!(peaks.iter().all(|p| p.value == 1.0));
    }

    #[test]
    fn test_close_pulses_are_merged() {
        // Pulses every 5 samples: within the 10-sample debounce window.
        let signal = pulses(6, 2, 5);
        let peaks = detect_peaks(&signal, &PeakParams::default()).unwrap();
        let indices: Vec<usize> = peaks.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![3, 18]);
    }

    #[test]
    fn test_low_maxima_are_ignored() {
        let signal = vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.0];
        let peaks = detect_peaks(&signal, &PeakParams::default()).unwrap();
        assert_eq!(peaks, vec![Peak { index: 1, value: 1.0 }]);
    }

    #[test]
    fn test_plateau_is_not_a_peak() {
        let signal = vec![1.0; 20];
        assert!(detect_peaks(&signal, &PeakParams::default()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_signal() {
        assert_eq!(
            detect_peaks(&[], &PeakParams::default()),
            Err(AnalysisError::EmptySignal)
        );
    }

    #[test]
    fn test_radial_distances_align_with_contour() {
        let contour = Contour::from_points(vec![
            Point::new(10, 5),
            Point::new(7, 9),
            Point::new(10, 5),
        ]);
        let d = radial_distances(&contour, Point::new(10, 5));
        assert_eq!(d, vec![0.0, 5.0, 0.0]);
    }
}
