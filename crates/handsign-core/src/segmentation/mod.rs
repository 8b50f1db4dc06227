//! Foreground extraction: skin chroma thresholding and mask cleanup.

pub mod morphology;
pub mod skin;
