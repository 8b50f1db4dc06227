//! Raster-scan shape metrics.
//!
//! The perimeter here is a transition count, not a geometric length: every
//! position in row-major order whose value differs from the previously
//! scanned value counts once, and the scan value carries over from the end
//! of one row to the start of the next. The classifier's normalization
//! constants are fitted to exactly this definition.

use serde::{Deserialize, Serialize};

use crate::image::{BACKGROUND, Mask, Point};

/// Area and transition-count perimeter of a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Foreground pixel count.
    pub area: u32,
    /// Raster transition count.
    pub perimeter: u32,
}

/// Count foreground pixels.
pub fn area(mask: &Mask) -> u32 {
    mask.as_plane()
        .samples
        .iter()
        .filter(|&&s| s != BACKGROUND)
        .count() as u32
}

/// Count raster-order value changes, starting from background.
pub fn perimeter(mask: &Mask) -> u32 {
    let mut previous = BACKGROUND;
    let mut transitions = 0;
    for &s in &mask.as_plane().samples {
        if s != previous {
            transitions += 1;
        }
        previous = s;
    }
    transitions
}

/// Both metrics in one call.
pub fn measure(mask: &Mask) -> Metrics {
    Metrics {
        area: area(mask),
        perimeter: perimeter(mask),
    }
}

/// Bottom-most foreground row and the rounded mean column of its foreground
/// pixels. `None` for an empty mask.
pub fn base_reference(mask: &Mask) -> Option<Point> {
    mask.as_plane()
        .rows()
        .enumerate()
        .rev()
        .find_map(|(row, samples)| {
            let (count, sum) = samples
                .iter()
                .enumerate()
                .filter(|&(_, &s)| s != BACKGROUND)
                .fold((0u64, 0u64), |(n, sum), (col, _)| (n + 1, sum + col as u64));
            (count > 0).then(|| Point::new(row as u32, (sum as f64 / count as f64).round() as u32))
        })
}
