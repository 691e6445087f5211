//! Colormap implementations for raster rendering.
//!
//! This module provides matplotlib-style continuous colormaps and discrete
//! listed colormaps with boundary normalization.

pub mod colormap;
pub mod diverging;
pub mod listed;
pub mod sequential;

pub use colormap::{parse_color, Colormap, Rgba, TRANSPARENT, UNDER_THRESHOLD};
pub use listed::{BinIndex, BoundaryNorm, ListedColormap};

// Re-export commonly used colormaps
pub use diverging::BrBG;
pub use sequential::{Binary, Blues};
