//! Plane, image and mask representations for the gesture pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Width of a capture frame in pixels.
pub const FRAME_WIDTH: u32 = 320;
/// Height of a capture frame in pixels.
pub const FRAME_HEIGHT: u32 = 240;

/// Foreground sample value in a [`Mask`].
pub const FOREGROUND: u8 = 255;
/// Background sample value in a [`Mask`].
pub const BACKGROUND: u8 = 0;

/// A single-channel 8-bit sample grid, row-major with the origin top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    /// Plane width in samples.
    pub width: u32,
    /// Plane height in samples.
    pub height: u32,
    /// Samples in row-major order. Length = width × height.
    pub samples: Vec<u8>,
}

impl Plane {
    /// Create a plane filled with `value`.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            samples: vec![value; (width as usize) * (height as usize)],
        }
    }

    /// Wrap existing row-major samples.
    pub fn from_samples(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, AnalysisError> {
        let expected = (width as usize) * (height as usize);
        if samples.len() != expected {
            return Err(AnalysisError::DimensionMismatch {
                expected,
                found: samples.len(),
            });
        }
        Ok(Self { width, height, samples })
    }

    /// Build a plane by evaluating `f(row, col)` for every sample.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Self {
        let mut samples = Vec::with_capacity((width as usize) * (height as usize));
        for row in 0..height {
            for col in 0..width {
                samples.push(f(row, col));
            }
        }
        Self { width, height, samples }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the plane holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at `(row, col)`. Panics when out of bounds.
    pub fn get(&self, row: u32, col: u32) -> u8 {
        self.samples[self.index(row, col)]
    }

    /// Sample at a signed position, or `None` when it falls outside the plane.
    pub fn get_signed(&self, row: i64, col: i64) -> Option<u8> {
        if row < 0 || col < 0 || row >= self.height as i64 || col >= self.width as i64 {
            return None;
        }
        Some(self.samples[self.index(row as u32, col as u32)])
    }

    /// Overwrite the sample at `(row, col)`.
    pub fn set(&mut self, row: u32, col: u32, value: u8) {
        let idx = self.index(row, col);
        self.samples[idx] = value;
    }

    /// Iterate rows as slices.
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = &[u8]> + ExactSizeIterator {
        self.samples.chunks(self.width.max(1) as usize)
    }

    fn index(&self, row: u32, col: u32) -> usize {
        (row as usize) * (self.width as usize) + col as usize
    }

    pub(crate) fn same_dimensions(&self, other: &Plane) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// A three-plane RGB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    /// Red plane.
    pub red: Plane,
    /// Green plane.
    pub green: Plane,
    /// Blue plane.
    pub blue: Plane,
}

impl RgbImage {
    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.red.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.red.height
    }

    /// Build an image from interleaved `[r, g, b]` triples.
    pub fn from_interleaved(width: u32, height: u32, rgb: &[u8]) -> Result<Self, AnalysisError> {
        let expected = (width as usize) * (height as usize) * 3;
        if rgb.len() != expected {
            return Err(AnalysisError::DimensionMismatch {
                expected,
                found: rgb.len(),
            });
        }
        let plane = |offset: usize| Plane {
            width,
            height,
            samples: rgb.iter().skip(offset).step_by(3).copied().collect(),
        };
        Ok(Self {
            red: plane(0),
            green: plane(1),
            blue: plane(2),
        })
    }

    /// Build an image by evaluating `f(row, col) -> [r, g, b]`.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let count = (width as usize) * (height as usize);
        let mut red = Vec::with_capacity(count);
        let mut green = Vec::with_capacity(count);
        let mut blue = Vec::with_capacity(count);
        for row in 0..height {
            for col in 0..width {
                let [r, g, b] = f(row, col);
                red.push(r);
                green.push(g);
                blue.push(b);
            }
        }
        Self {
            red: Plane { width, height, samples: red },
            green: Plane { width, height, samples: green },
            blue: Plane { width, height, samples: blue },
        }
    }
}

/// Luma plus blue- and red-difference chroma planes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YCbCrImage {
    /// Luma plane. Carried for the color-space contract; segmentation ignores it.
    pub luma: Plane,
    /// Blue-difference chroma.
    pub cb: Plane,
    /// Red-difference chroma.
    pub cr: Plane,
}

/// Binary plane: [`FOREGROUND`] marks hand pixels, [`BACKGROUND`] the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask(Plane);

impl Mask {
    /// An all-background mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self(Plane::filled(width, height, BACKGROUND))
    }

    /// Binarize a plane: any non-zero sample becomes foreground.
    pub fn from_plane(mut plane: Plane) -> Self {
        for s in &mut plane.samples {
            *s = if *s != 0 { FOREGROUND } else { BACKGROUND };
        }
        Self(plane)
    }

    /// Build a mask from a predicate over `(row, col)`.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        Self(Plane::from_fn(width, height, |r, c| {
            if f(r, c) { FOREGROUND } else { BACKGROUND }
        }))
    }

    /// Mask width.
    pub fn width(&self) -> u32 {
        self.0.width
    }

    /// Mask height.
    pub fn height(&self) -> u32 {
        self.0.height
    }

    /// Whether `(row, col)` is foreground.
    pub fn is_foreground(&self, row: u32, col: u32) -> bool {
        self.0.get(row, col) == FOREGROUND
    }

    /// Foreground test at a signed position; outside the mask is background.
    pub fn is_foreground_signed(&self, row: i64, col: i64) -> bool {
        self.0.get_signed(row, col) == Some(FOREGROUND)
    }

    /// Set `(row, col)` to foreground or background.
    pub fn set(&mut self, row: u32, col: u32, foreground: bool) {
        self.0
            .set(row, col, if foreground { FOREGROUND } else { BACKGROUND });
    }

    /// Borrow the underlying plane.
    pub fn as_plane(&self) -> &Plane {
        &self.0
    }

    /// Unwrap into the underlying plane.
    pub fn into_plane(self) -> Plane {
        self.0
    }
}

/// Integer pixel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Row index, 0 at the top.
    pub row: u32,
    /// Column index, 0 at the left.
    pub col: u32,
}

impl Point {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
