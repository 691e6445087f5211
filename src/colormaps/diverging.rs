//! Diverging colormaps (two-hue progression with center).
//!
//! These colormaps are suitable for data that diverges from a central value,
//! such as terrain heights around a reference level.

use once_cell::sync::Lazy;

use super::colormap::{lut_lookup, sample_gradient, Colormap, Rgba};

static BRBG_LUT: Lazy<Vec<Rgba>> = Lazy::new(|| sample_gradient(&colorgrad::br_bg()));

/// BrBG colormap - brown through white to blue-green
pub struct BrBG;

impl Colormap for BrBG {
    fn map_normalized(&self, value: f32) -> Rgba {
        lut_lookup(&BRBG_LUT, value)
    }

    fn name(&self) -> &str {
        "BrBG"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brbg_hues() {
        // Low end is brown (red dominates blue), high end is blue-green.
        let low = BrBG.map_normalized(0.0);
        let high = BrBG.map_normalized(1.0);
        assert!(low[0] > low[2]);
        assert!(high[1] > high[0]);
    }

    #[test]
    fn test_brbg_center_is_light() {
        let mid = BrBG.map_normalized(0.5);
        assert!(mid.iter().take(3).all(|&c| c > 200));
    }
}
