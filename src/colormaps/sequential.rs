//! Sequential colormaps (single-hue progression).
//!
//! These colormaps are suitable for data that progresses from low to high.

use once_cell::sync::Lazy;

use super::colormap::{lut_lookup, sample_gradient, Colormap, Rgba, LUT_SIZE};

static BLUES_LUT: Lazy<Vec<Rgba>> = Lazy::new(|| sample_gradient(&colorgrad::blues()));

/// Blues colormap - white to dark blue, the default for unknown variables
pub struct Blues;

impl Colormap for Blues {
    fn map_normalized(&self, value: f32) -> Rgba {
        lut_lookup(&BLUES_LUT, value)
    }

    fn name(&self) -> &str {
        "Blues"
    }
}

/// Binary colormap - white at the low end, black at the high end
pub struct Binary;

impl Colormap for Binary {
    fn map_normalized(&self, value: f32) -> Rgba {
        let t = value.clamp(0.0, 1.0) as f64;
        let index = ((t * LUT_SIZE as f64) as usize).min(LUT_SIZE - 1);
        let v = 255 - index as u8;
        [v, v, v, 255]
    }

    fn name(&self) -> &str {
        "binary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colormap_names() {
        assert_eq!(Blues.name(), "Blues");
        assert_eq!(Binary.name(), "binary");
    }

    #[test]
    fn test_binary_endpoints() {
        assert_eq!(Binary.map_normalized(0.0), [255, 255, 255, 255]);
        assert_eq!(Binary.map_normalized(1.0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_blues_darkens() {
        let low = Blues.map_normalized(0.0);
        let high = Blues.map_normalized(1.0);
        let intensity = |c: Rgba| c[0] as u32 + c[1] as u32 + c[2] as u32;
        assert!(intensity(low) > intensity(high));
        assert!(high[2] > high[0]);
        assert_eq!(low[3], 255);
    }
}
