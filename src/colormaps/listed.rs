//! Discrete colormaps driven by boundary normalization.
//!
//! A [`BoundaryNorm`] partitions values into right-open bins
//! `[b[i], b[i + 1])`. When a palette has more colors than there are bins,
//! the palette is spread across the bins and the last palette entry becomes
//! the color for values at or above the final boundary.

use serde::{Deserialize, Serialize};

use super::colormap::{Rgba, TRANSPARENT};
use crate::error::{OverlayError, Result};

/// Where a value falls relative to a boundary normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinIndex {
    /// Below the first boundary
    Under,
    /// Inside bin `i`
    Bin(usize),
    /// At or above the last boundary
    Over,
}

/// Boundary normalization over strictly increasing edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryNorm {
    boundaries: Vec<f64>,
}

impl BoundaryNorm {
    /// Create a normalization, validating at least two strictly increasing edges
    pub fn new(boundaries: Vec<f64>) -> Result<Self> {
        if boundaries.len() < 2 {
            return Err(OverlayError::InvalidParameter {
                param: "boundaries".to_string(),
                message: format!("need at least 2 boundaries, got {}", boundaries.len()),
            });
        }
        if let Some(w) = boundaries.windows(2).find(|w| !(w[0] < w[1])) {
            return Err(OverlayError::InvalidParameter {
                param: "boundaries".to_string(),
                message: format!("boundaries must be strictly increasing ({} >= {})", w[0], w[1]),
            });
        }
        Ok(Self { boundaries })
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Number of bins between the boundaries
    pub fn bin_count(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Classify a value into a bin
    pub fn classify(&self, value: f64) -> BinIndex {
        let last = self.boundaries[self.boundaries.len() - 1];
        if value.is_nan() || value < self.boundaries[0] {
            return BinIndex::Under;
        }
        if value >= last {
            return BinIndex::Over;
        }
        // Number of edges <= value, minus one, is the bin index.
        let edges_below = self.boundaries.partition_point(|&b| b <= value);
        BinIndex::Bin(edges_below - 1)
    }

    /// Assign one palette entry to each bin.
    ///
    /// With as many colors as bins the mapping is one-to-one. With more colors,
    /// bin `i` takes entry `trunc(i * (ncolors - 1) / (nbins - 1))`, and a
    /// single bin takes the middle entry.
    pub fn spread(&self, palette: &[Rgba]) -> Result<Vec<Rgba>> {
        let nbins = self.bin_count();
        let ncolors = palette.len();
        if ncolors < nbins {
            return Err(OverlayError::InvalidParameter {
                param: "palette".to_string(),
                message: format!("{} colors cannot cover {} bins", ncolors, nbins),
            });
        }
        if ncolors == nbins {
            return Ok(palette.to_vec());
        }
        if nbins == 1 {
            return Ok(vec![palette[(ncolors - 1) / 2]]);
        }
        let scale = (ncolors - 1) as f64 / (nbins - 1) as f64;
        Ok((0..nbins)
            .map(|i| {
                let index = ((scale * i as f64) as usize).min(ncolors - 1);
                palette[index]
            })
            .collect())
    }
}

/// A listed colormap: one color per bin plus an over color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedColormap {
    pub norm: BoundaryNorm,
    /// One color per bin, `colors.len() == norm.bin_count()`
    pub colors: Vec<Rgba>,
    /// Color for values at or above the last boundary
    pub over: Rgba,
}

impl ListedColormap {
    /// Build a listed colormap from a palette and its boundaries
    pub fn from_palette(palette: &[Rgba], boundaries: Vec<f64>) -> Result<Self> {
        let norm = BoundaryNorm::new(boundaries)?;
        let colors = norm.spread(palette)?;
        let over = palette[palette.len() - 1];
        Ok(Self { norm, colors, over })
    }

    /// Map a raw data value; values under the first boundary are transparent
    pub fn map_value(&self, value: f64) -> Rgba {
        match self.norm.classify(value) {
            BinIndex::Under => TRANSPARENT,
            BinIndex::Bin(i) => self.colors[i],
            BinIndex::Over => self.over,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(n: u8) -> Rgba {
        [n, n, n, 255]
    }

    #[test]
    fn test_rejects_unsorted_boundaries() {
        assert!(BoundaryNorm::new(vec![0.0, 2.0, 1.0]).is_err());
        assert!(BoundaryNorm::new(vec![1.0, 1.0]).is_err());
        assert!(BoundaryNorm::new(vec![1.0]).is_err());
    }

    #[test]
    fn test_classify_right_open_bins() {
        let norm = BoundaryNorm::new(vec![0.0, 1.0, 2.0, 4.0]).unwrap();
        assert_eq!(norm.classify(-0.5), BinIndex::Under);
        assert_eq!(norm.classify(0.0), BinIndex::Bin(0));
        assert_eq!(norm.classify(1.0), BinIndex::Bin(1));
        assert_eq!(norm.classify(3.99), BinIndex::Bin(2));
        assert_eq!(norm.classify(4.0), BinIndex::Over);
        assert_eq!(norm.classify(f64::NAN), BinIndex::Under);
    }

    #[test]
    fn test_spread_one_to_one() {
        let norm = BoundaryNorm::new(vec![0.0, 1.0, 2.0]).unwrap();
        let palette = [gray(1), gray(2)];
        assert_eq!(norm.spread(&palette).unwrap(), palette.to_vec());
    }

    #[test]
    fn test_spread_more_colors_than_bins() {
        // 10 colors over 9 bins: the ninth palette entry is skipped.
        let norm = BoundaryNorm::new(vec![0.0, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0, 255.0])
            .unwrap();
        let palette: Vec<Rgba> = (0..10).map(gray).collect();
        let colors = norm.spread(&palette).unwrap();
        assert_eq!(colors.len(), 9);
        assert_eq!(colors[0], gray(0));
        assert_eq!(colors[7], gray(7));
        assert_eq!(colors[8], gray(9));
    }

    #[test]
    fn test_spread_too_few_colors() {
        let norm = BoundaryNorm::new(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert!(norm.spread(&[gray(1)]).is_err());
    }

    #[test]
    fn test_listed_over_color() {
        let cmap = ListedColormap::from_palette(&[gray(1), gray(2), gray(3)], vec![0.0, 1.0, 2.0])
            .unwrap();
        assert_eq!(cmap.map_value(0.5), gray(1));
        assert_eq!(cmap.map_value(2.0), gray(3));
        assert_eq!(cmap.map_value(-1.0), TRANSPARENT);
    }
}
