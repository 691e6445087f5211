//! Colormap trait and utilities.
//!
//! This module defines the common interface for all continuous colormaps
//! and the pixel conventions shared by every renderer.

use crate::error::{OverlayError, Result};

/// An RGBA pixel.
pub type Rgba = [u8; 4];

/// Fully transparent pixel used for under, bad and no-data values.
pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// Values strictly below this threshold are treated as missing.
pub const UNDER_THRESHOLD: f32 = 0.1;

/// Number of entries in a continuous colormap lookup table.
pub const LUT_SIZE: usize = 256;

/// Trait for continuous color mapping implementations
pub trait Colormap: Send + Sync {
    /// Map a normalized value (0.0 to 1.0) to an RGBA color
    fn map_normalized(&self, value: f32) -> Rgba;

    /// Map a value to an RGBA color given the data range.
    ///
    /// A degenerate range maps everything to the low end.
    fn map(&self, value: f32, min: f32, max: f32) -> Rgba {
        let normalized = if max > min {
            ((value - min) / (max - min)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.map_normalized(normalized)
    }

    /// Get the name of this colormap
    fn name(&self) -> &str;
}

/// Look up a normalized value in a lookup table.
///
/// `t == 1.0` lands on the last entry; everything else uses `trunc(t * N)`.
pub fn lut_lookup(lut: &[Rgba], value: f32) -> Rgba {
    if lut.is_empty() {
        return TRANSPARENT;
    }
    let t = value.clamp(0.0, 1.0) as f64;
    let index = ((t * lut.len() as f64) as usize).min(lut.len() - 1);
    lut[index]
}

/// Sample a `colorgrad` gradient into an opaque lookup table.
pub fn sample_gradient(gradient: &colorgrad::Gradient) -> Vec<Rgba> {
    (0..LUT_SIZE)
        .map(|i| {
            let [r, g, b, _] = gradient
                .at(i as f64 / (LUT_SIZE - 1) as f64)
                .to_rgba8();
            [r, g, b, 255]
        })
        .collect()
}

/// Parse a CSS color (hex or name) into an opaque RGBA pixel.
pub fn parse_color(spec: &str) -> Result<Rgba> {
    let color = colorgrad::Color::from_html(spec).map_err(|e| OverlayError::InvalidParameter {
        param: "color".to_string(),
        message: format!("Cannot parse color '{}': {}", spec, e),
    })?;
    let [r, g, b, _] = color.to_rgba8();
    Ok([r, g, b, 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lut_lookup_edges() {
        let lut: Vec<Rgba> = (0..LUT_SIZE).map(|i| [i as u8, 0, 0, 255]).collect();
        assert_eq!(lut_lookup(&lut, 0.0)[0], 0);
        assert_eq!(lut_lookup(&lut, 1.0)[0], 255);
        assert_eq!(lut_lookup(&lut, 0.5)[0], 128);
        assert_eq!(lut_lookup(&lut, -3.0)[0], 0);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ff0000").unwrap(), [255, 0, 0, 255]);
        assert_eq!(parse_color("green").unwrap(), [0, 128, 0, 255]);
        assert_eq!(parse_color("yellow").unwrap(), [255, 255, 0, 255]);
        assert!(parse_color("not-a-color").is_err());
    }

    #[test]
    fn test_degenerate_range_maps_low() {
        let cmap = crate::colormaps::Binary;
        assert_eq!(cmap.map(5.0, 5.0, 5.0), cmap.map_normalized(0.0));
    }
}
