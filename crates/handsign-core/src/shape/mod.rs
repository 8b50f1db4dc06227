//! Shape analysis: raster metrics, boundary tracing, and radial peaks.

pub mod contour;
pub mod metrics;
pub mod radial;

pub use contour::Contour;
pub use metrics::Metrics;
pub use radial::Peak;
