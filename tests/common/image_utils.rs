//! Image inspection utilities for testing.
//!
//! This module provides helper functions for checking rendered PNGs.

#![allow(dead_code)]

use image::{ImageError, ImageFormat, RgbaImage};
use std::path::Path;

/// Load a PNG as RGBA, checking the on-disk format
pub fn load_png(path: &Path) -> Result<RgbaImage, ImageError> {
    let bytes = std::fs::read(path).map_err(ImageError::IoError)?;
    assert_eq!(
        image::guess_format(&bytes)?,
        ImageFormat::Png,
        "{} is not a PNG",
        path.display()
    );
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

/// Count pixels with zero alpha
pub fn count_transparent(img: &RgbaImage) -> usize {
    img.pixels().filter(|p| p.0[3] == 0).count()
}

/// Count pixels with full alpha
pub fn count_opaque(img: &RgbaImage) -> usize {
    img.pixels().filter(|p| p.0[3] == 255).count()
}

/// Assert every pixel is either fully transparent or fully opaque
pub fn assert_binary_alpha(img: &RgbaImage) {
    let partial = img
        .pixels()
        .filter(|p| p.0[3] != 0 && p.0[3] != 255)
        .count();
    assert_eq!(partial, 0, "{} pixels have partial alpha", partial);
}
