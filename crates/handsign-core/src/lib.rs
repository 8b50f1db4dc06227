//! Handsign Core — domain layer for hand-gesture classification.
//!
//! This crate contains the whole local image-analysis path: color plane
//! helpers, illumination compensation, skin segmentation, morphology,
//! boundary tracing, radial peak detection and the rule classifier.
//! No I/O or hardware dependencies.

pub mod classify;
pub mod color;
pub mod error;
pub mod image;
pub mod params;
pub mod pipeline;
pub mod segmentation;
pub mod shape;

// Re-exports for convenience.
pub use classify::{GestureLabel, classify};
pub use error::AnalysisError;
pub use image::{FRAME_HEIGHT, FRAME_WIDTH, Mask, Plane, Point, RgbImage, YCbCrImage};
pub use params::PipelineParams;
pub use pipeline::{FrameReport, HandAnalysis, analyze, analyze_with_mask, try_analyze};
