//! Frame loading and plane dumps.

use std::path::Path;

use handsign_core::{AnalysisError, FRAME_HEIGHT, FRAME_WIDTH, Plane, RgbImage};
use image::imageops::FilterType;

/// Load an image from disk as a capture frame.
///
/// Supports common formats via the `image` crate. Alpha is dropped and the
/// image is resized to 320×240 when its dimensions differ.
pub fn load_frame(path: &Path) -> Result<RgbImage, ImageLoadError> {
    let img = image::open(path).map_err(ImageLoadError::Decode)?;
    let mut rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    if (width, height) != (FRAME_WIDTH, FRAME_HEIGHT) {
        tracing::info!("Resizing {width}x{height} image to {FRAME_WIDTH}x{FRAME_HEIGHT}");
        rgb = image::imageops::resize(&rgb, FRAME_WIDTH, FRAME_HEIGHT, FilterType::Triangle);
    }
    RgbImage::from_interleaved(FRAME_WIDTH, FRAME_HEIGHT, rgb.as_raw()).map_err(ImageLoadError::Layout)
}

/// Write a single plane as an 8-bit grayscale PNG.
pub fn save_plane(plane: &Plane, path: &Path) -> Result<(), ImageLoadError> {
    let gray = image::GrayImage::from_raw(plane.width, plane.height, plane.samples.clone()).ok_or(
        ImageLoadError::Layout(AnalysisError::DimensionMismatch {
            expected: (plane.width as usize) * (plane.height as usize),
            found: plane.samples.len(),
        }),
    )?;
    gray.save(path).map_err(ImageLoadError::Encode)?;
    tracing::info!("Wrote {}x{} plane to {}", plane.width, plane.height, path.display());
    Ok(())
}

/// Errors that can occur while loading or writing images.
#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(image::ImageError),
    #[error("unexpected pixel layout: {0}")]
    Layout(AnalysisError),
}
