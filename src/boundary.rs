//! Boundary polygons used to place raster overlays.
//!
//! A boundary is a GeoJSON feature collection. Only the first feature's
//! bounding box positions an overlay; the rest ride along for display.

use std::path::Path;

use geo::BoundingRect;
use geojson::{Feature, FeatureCollection, GeoJson};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OverlayError, Result};

/// Axis-aligned bounds in source coordinate order (x = lon, y = lat)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Leaflet bounds `[[south, west], [north, east]]`
    pub fn to_overlay_bounds(&self) -> [[f64; 2]; 2] {
        [[self.min_y, self.min_x], [self.max_y, self.max_x]]
    }

    /// Center as `(lat, lon)`
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_y + self.max_y) / 2.0,
            (self.min_x + self.max_x) / 2.0,
        )
    }
}

/// A collection of boundary features
#[derive(Debug, Clone, Default)]
pub struct Boundary {
    features: Vec<Feature>,
}

impl Boundary {
    pub fn from_features(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Parse GeoJSON text: a feature collection, single feature or bare geometry
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let features = match text.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(geometry) => vec![Feature::from(geometry)],
        };
        Ok(Self { features })
    }

    /// Load a GeoJSON boundary file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let boundary = Self::from_geojson_str(&text)?;
        debug!(
            path = %path.display(),
            features = boundary.feature_count(),
            "Boundary loaded"
        );
        Ok(boundary)
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Bounding box of the first feature's geometry
    pub fn first_feature_bounds(&self) -> Result<BoundingBox> {
        let feature = self.features.first().ok_or(OverlayError::EmptyBoundary)?;
        let geometry = feature
            .geometry
            .clone()
            .ok_or_else(|| OverlayError::InvalidParameter {
                param: "boundary".to_string(),
                message: "first feature has no geometry".to_string(),
            })?;
        let geometry: geo::Geometry<f64> = geometry.try_into()?;
        let rect = geometry
            .bounding_rect()
            .ok_or_else(|| OverlayError::InvalidParameter {
                param: "boundary".to_string(),
                message: "first feature geometry is empty".to_string(),
            })?;
        Ok(BoundingBox::new(
            rect.min().x,
            rect.min().y,
            rect.max().x,
            rect.max().y,
        ))
    }

    /// The boundary as a GeoJSON feature collection value
    pub fn to_geojson_value(&self) -> Result<serde_json::Value> {
        let collection = FeatureCollection {
            bbox: None,
            features: self.features.clone(),
            foreign_members: None,
        };
        Ok(serde_json::to_value(&collection)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"name": "basin"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[10, 20], [15, 20], [15, 25], [10, 25], [10, 20]]]
                }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "Point", "coordinates": [100, 50]}
            }
        ]
    }"#;

    #[test]
    fn test_first_feature_bounds() {
        let boundary = Boundary::from_geojson_str(SQUARE).unwrap();
        assert_eq!(boundary.feature_count(), 2);
        let bbox = boundary.first_feature_bounds().unwrap();
        assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 15.0, 25.0));
        assert_eq!(bbox.to_overlay_bounds(), [[20.0, 10.0], [25.0, 15.0]]);
        assert_eq!(bbox.center(), (22.5, 12.5));
    }

    #[test]
    fn test_empty_collection() {
        let boundary =
            Boundary::from_geojson_str(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        assert!(matches!(
            boundary.first_feature_bounds(),
            Err(OverlayError::EmptyBoundary)
        ));
    }

    #[test]
    fn test_bare_geometry() {
        let boundary = Boundary::from_geojson_str(
            r#"{"type": "LineString", "coordinates": [[-1.5, 2], [3, -4]]}"#,
        )
        .unwrap();
        let bbox = boundary.first_feature_bounds().unwrap();
        assert_eq!(bbox, BoundingBox::new(-1.5, -4.0, 3.0, 2.0));
    }

    #[test]
    fn test_feature_without_geometry() {
        let boundary = Boundary::from_geojson_str(
            r#"{"type": "Feature", "properties": {}, "geometry": null}"#,
        )
        .unwrap();
        assert!(boundary.first_feature_bounds().is_err());
    }

    #[test]
    fn test_invalid_geojson() {
        assert!(Boundary::from_geojson_str("{\"type\": \"Nope\"}").is_err());
    }
}
