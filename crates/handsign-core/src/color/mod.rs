//! Color handling: plane helpers, luma/chroma conversion, and gray-world
//! illumination compensation.

pub mod illumination;
pub mod planes;
