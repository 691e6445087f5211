//! Error types for rasteroverlay.
//!
//! Every failure in the overlay pipeline surfaces synchronously as one of
//! these variants; nothing is retried or downgraded to a warning.

use thiserror::Error;

/// The main error type for rasteroverlay operations.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding errors
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// PNG encoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// GeoJSON parsing errors
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Raster lacks data or georeferencing we can work with
    #[error("Unsupported raster: {message}")]
    UnsupportedRaster { message: String },

    /// Projection setup or coordinate transformation errors
    #[error("Projection error: {message}")]
    Projection { message: String },

    /// The boundary collection has no features to take bounds from
    #[error("Boundary has no features")]
    EmptyBoundary,

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Convenience type alias for Results with OverlayError
pub type Result<T> = std::result::Result<T, OverlayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = OverlayError::InvalidParameter {
            param: "zoom".to_string(),
            message: "must be between 0 and 24".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameter: zoom - must be between 0 and 24"
        );
        assert_eq!(
            OverlayError::EmptyBoundary.to_string(),
            "Boundary has no features"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.tif");
        let err: OverlayError = io.into();
        assert!(matches!(err, OverlayError::Io(_)));
    }
}
