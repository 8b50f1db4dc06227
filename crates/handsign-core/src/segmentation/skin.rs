//! Skin segmentation by chroma range tests.

use crate::color::planes::in_range;
use crate::image::{Mask, YCbCrImage};
use crate::params::SkinThresholds;

/// Foreground where both `Cb` and `Cr` fall inside their inclusive bounds.
pub fn segment(image: &YCbCrImage, thresholds: &SkinThresholds) -> Mask {
    let cb = in_range(&image.cb, thresholds.cb[0], thresholds.cb[1]);
    let cr = in_range(&image.cr, thresholds.cr[0], thresholds.cr[1]);
    let (width, height) = (cb.width(), cb.height());
    Mask::from_fn(width, height, |r, c| {
        cb.is_foreground(r, c) && cr.is_foreground(r, c)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Plane;

    fn ycc(cb: Vec<u8>, cr: Vec<u8>) -> YCbCrImage {
        let n = cb.len() as u32;
        YCbCrImage {
            luma: Plane::filled(n, 1, 0),
            cb: Plane::from_samples(n, 1, cb).unwrap(),
            cr: Plane::from_samples(n, 1, cr).unwrap(),
        }
    }

    #[test]
    fn test_requires_both_ranges() {
        let img = ycc(vec![100, 100, 130, 95, 120], vec![150, 180, 150, 140, 170]);
        let mask = segment(&img, &SkinThresholds::default());
        assert_eq!(mask.as_plane().samples, vec![255, 0, 0, 255, 255]);
    }
}
