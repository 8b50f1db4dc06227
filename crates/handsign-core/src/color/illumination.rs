//! Gray-world illumination compensation.
//!
//! The gray-world assumption says the average of a scene is neutral. Each
//! plane is scaled by `mean_plane / max(meanR, meanG, meanB)`, pulling the
//! weaker channels down to the strongest one's balance. Gains never exceed
//! 1, so scaling cannot overflow.

use serde::{Deserialize, Serialize};

use crate::color::planes::mean;
use crate::image::{Plane, RgbImage};

/// Per-plane gains applied by [`compensate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelGains {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl ChannelGains {
    /// Unit gains (no correction).
    pub const IDENTITY: Self = Self {
        red: 1.0,
        green: 1.0,
        blue: 1.0,
    };
}

/// Compute gray-world gains from the plane means.
///
/// An empty or all-black image yields [`ChannelGains::IDENTITY`].
pub fn gray_world_gains(image: &RgbImage) -> ChannelGains {
    let means = [mean(&image.red), mean(&image.green), mean(&image.blue)];
    let max_mean = means.iter().copied().fold(0.0_f64, f64::max);
    if max_mean <= 0.0 {
        return ChannelGains::IDENTITY;
    }
    ChannelGains {
        red: means[0] / max_mean,
        green: means[1] / max_mean,
        blue: means[2] / max_mean,
    }
}

/// Apply gray-world compensation, returning a new image and the gains used.
///
/// Scaled samples are truncated toward zero.
pub fn compensate(image: &RgbImage) -> (RgbImage, ChannelGains) {
    let gains = gray_world_gains(image);
    tracing::debug!(
        red = gains.red,
        green = gains.green,
        blue = gains.blue,
        "gray-world gains"
    );
    let out = RgbImage {
        red: scale(&image.red, gains.red),
        green: scale(&image.green, gains.green),
        blue: scale(&image.blue, gains.blue),
    };
    (out, gains)
}

fn scale(plane: &Plane, gain: f64) -> Plane {
    Plane {
        width: plane.width,
        height: plane.height,
        samples: plane
            .samples
            .iter()
            .map(|&s| (s as f64 * gain) as u8)
            .collect(),
    }
}
