//! Binary morphology with the 3×3 plus-shaped structuring element.
//!
//! ```text
//! . X .
//! X X X
//! . X .
//! ```
//! Samples outside the mask count as background for both operations.

use crate::image::Mask;

const PLUS: [(i64, i64); 5] = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)];

/// Foreground only where every element of the kernel lands on foreground.
pub fn erode(mask: &Mask) -> Mask {
    Mask::from_fn(mask.width(), mask.height(), |r, c| {
        PLUS.iter()
            .all(|&(dr, dc)| mask.is_foreground_signed(r as i64 + dr, c as i64 + dc))
    })
}

/// Foreground wherever any element of the kernel lands on foreground.
pub fn dilate(mask: &Mask) -> Mask {
    Mask::from_fn(mask.width(), mask.height(), |r, c| {
        PLUS.iter()
            .any(|&(dr, dc)| mask.is_foreground_signed(r as i64 + dr, c as i64 + dc))
    })
}

/// Opening: one erosion followed by one dilation. Removes speckles smaller
/// than the kernel and smooths the boundary.
pub fn open(mask: &Mask) -> Mask {
    dilate(&erode(mask))
}
