use serde::{Deserialize, Serialize};

/// Failures of the local image-analysis path.
///
/// The boundary and signal variants are terminal for a single frame only:
/// [`crate::pipeline::analyze`] records them and reports `Unrecognized`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisError {
    #[error("no foreground pixel on the bottom row to start tracing from")]
    NoBoundary,
    #[error("boundary walk did not close after {steps} steps")]
    OpenBoundary { steps: usize },
    #[error("peak detection on an empty distance signal")]
    EmptySignal,
    #[error("dimension mismatch: expected {expected} samples, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}
