//! Per-plane numeric helpers: split/merge, mean, range test, and the
//! 8-bit RGB → YCbCr conversion used ahead of skin segmentation.

use crate::error::AnalysisError;
use crate::image::{Mask, Plane, RgbImage, YCbCrImage};

/// Split an image into its `[R, G, B]` planes.
pub fn split(image: RgbImage) -> [Plane; 3] {
    [image.red, image.green, image.blue]
}

/// Merge `[R, G, B]` planes into an image. All planes must share dimensions.
pub fn merge([red, green, blue]: [Plane; 3]) -> Result<RgbImage, AnalysisError> {
    for other in [&green, &blue] {
        if !red.same_dimensions(other) {
            return Err(AnalysisError::DimensionMismatch {
                expected: red.len(),
                found: other.len(),
            });
        }
    }
    Ok(RgbImage { red, green, blue })
}

/// Arithmetic mean of a plane. An empty plane has mean 0.
pub fn mean(plane: &Plane) -> f64 {
    if plane.is_empty() {
        return 0.0;
    }
    let sum: u64 = plane.samples.iter().map(|&s| s as u64).sum();
    sum as f64 / plane.len() as f64
}

/// Foreground wherever `lo <= sample <= hi`.
pub fn in_range(plane: &Plane, lo: u8, hi: u8) -> Mask {
    Mask::from_plane(Plane {
        width: plane.width,
        height: plane.height,
        samples: plane
            .samples
            .iter()
            .map(|&s| u8::from((lo..=hi).contains(&s)))
            .collect(),
    })
}

/// Convert 8-bit RGB to full-range YCbCr.
///
/// ```text
/// Y  = 0.299 R + 0.587 G + 0.114 B
/// Cr = (R − Y) × 0.713 + 128
/// Cb = (B − Y) × 0.564 + 128
/// ```
/// Each output is rounded and saturated to `[0, 255]`.
pub fn to_ycbcr(image: &RgbImage) -> YCbCrImage {
    let (width, height) = (image.width(), image.height());
    let count = image.red.len();
    let mut luma = Vec::with_capacity(count);
    let mut cb = Vec::with_capacity(count);
    let mut cr = Vec::with_capacity(count);

    for i in 0..count {
        let r = image.red.samples[i] as f64;
        let g = image.green.samples[i] as f64;
        let b = image.blue.samples[i] as f64;
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        luma.push(saturate(y));
        cr.push(saturate((r - y) * 0.713 + 128.0));
        cb.push(saturate((b - y) * 0.564 + 128.0));
    }

    YCbCrImage {
        luma: Plane { width, height, samples: luma },
        cb: Plane { width, height, samples: cb },
        cr: Plane { width, height, samples: cr },
    }
}

fn saturate(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
