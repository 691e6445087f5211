//! Raster reprojection to geographic coordinates.
//!
//! The output grid follows the GDAL warp convention: the source extent is
//! transformed to the target CRS, square pixels are sized so the output
//! diagonal keeps the source's pixel count, and each output pixel center
//! samples the nearest source cell. Cells outside the source get the
//! source no-data value, or 0 when there is none.

use std::path::Path;

use ndarray::Array2;
use tracing::{debug, info};

use crate::error::{OverlayError, Result};
use crate::geotiff::{read_geotiff, write_geotiff, GeoTransform, Raster};
use crate::projection::{CoordTransformer, Crs};

/// Samples per side when tracing the source extent into the target CRS
const EXTENT_SAMPLES: usize = 21;

/// Reproject a raster to a target coordinate system
pub fn reproject(raster: &Raster, target: &Crs) -> Result<Raster> {
    if &raster.crs == target {
        debug!(crs = %target, "Source already in target CRS");
        return Ok(raster.clone());
    }

    let forward = CoordTransformer::new(&raster.crs, target)?;
    let inverse = CoordTransformer::new(target, &raster.crs)?;

    let (min_x, min_y, max_x, max_y) = target_extent(raster, &forward)?;

    let src_diagonal = ((raster.width().pow(2) + raster.height().pow(2)) as f64).sqrt();
    let dst_diagonal = ((max_x - min_x).powi(2) + (max_y - min_y).powi(2)).sqrt();
    let resolution = dst_diagonal / src_diagonal;
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(OverlayError::Projection {
            message: format!("degenerate output resolution {}", resolution),
        });
    }

    let width = (((max_x - min_x) / resolution + 0.5) as usize).max(1);
    let height = (((max_y - min_y) / resolution + 0.5) as usize).max(1);
    let transform = GeoTransform {
        origin_x: min_x,
        origin_y: max_y,
        pixel_width: resolution,
        pixel_height: -resolution,
    };

    let fill = raster.nodata.unwrap_or(0.0) as f32;
    let mut data = Array2::from_elem((height, width), fill);
    for ((row, col), value) in data.indexed_iter_mut() {
        let (x, y) = transform.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5);
        let Ok((sx, sy)) = inverse.transform(x, y) else {
            continue;
        };
        let (src_col, src_row) = raster.transform.geo_to_pixel(sx, sy);
        if src_col < 0.0 || src_row < 0.0 {
            continue;
        }
        let (c, r) = (src_col.floor() as usize, src_row.floor() as usize);
        if c < raster.width() && r < raster.height() {
            *value = raster.data[[r, c]];
        }
    }

    info!(
        source_crs = %raster.crs,
        target_crs = %target,
        width = width,
        height = height,
        resolution = resolution,
        "Raster reprojected"
    );

    Ok(Raster {
        data,
        transform,
        crs: target.clone(),
        nodata: raster.nodata,
    })
}

/// Reproject a GeoTIFF file to EPSG:4326 and write the result.
///
/// The output is written under a temporary name and renamed into place, so
/// a failed warp never leaves a partial file at `destination`.
pub fn reproject_file(source: &Path, destination: &Path) -> Result<Raster> {
    let raster = read_geotiff(source)?;
    let warped = reproject(&raster, &Crs::WGS84)?;

    let mut partial = destination.as_os_str().to_owned();
    partial.push(".partial");
    let partial = std::path::PathBuf::from(partial);

    if let Err(e) = write_geotiff(&warped, &partial) {
        let _ = std::fs::remove_file(&partial);
        return Err(e);
    }
    std::fs::rename(&partial, destination)?;
    Ok(warped)
}

/// Bounding box of the source extent in the target CRS
fn target_extent(raster: &Raster, forward: &CoordTransformer) -> Result<(f64, f64, f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    let steps = (EXTENT_SAMPLES - 1) as f64;
    for i in 0..EXTENT_SAMPLES {
        for j in 0..EXTENT_SAMPLES {
            let col = raster.width() as f64 * i as f64 / steps;
            let row = raster.height() as f64 * j as f64 / steps;
            let (x, y) = raster.transform.pixel_to_geo(col, row);
            if let Ok((tx, ty)) = forward.transform(x, y) {
                min_x = min_x.min(tx);
                min_y = min_y.min(ty);
                max_x = max_x.max(tx);
                max_y = max_y.max(ty);
            }
        }
    }

    if !(min_x.is_finite() && min_y.is_finite() && max_x > min_x && max_y > min_y) {
        return Err(OverlayError::Projection {
            message: format!(
                "could not transform raster extent from {} to {}",
                forward.source_crs(),
                forward.target_crs()
            ),
        });
    }
    Ok((min_x, min_y, max_x, max_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utm_raster() -> Raster {
        // 20 x 10 cells of 1 km around 15°E, 52°N in UTM zone 33N.
        let data = Array2::from_shape_fn((10, 20), |(r, c)| (r * 20 + c) as f32);
        Raster {
            data,
            transform: GeoTransform {
                origin_x: 490_000.0,
                origin_y: 5_765_000.0,
                pixel_width: 1_000.0,
                pixel_height: -1_000.0,
            },
            crs: Crs::Epsg(32633),
            nodata: None,
        }
    }

    #[test]
    fn test_same_crs_is_identity() {
        let mut raster = utm_raster();
        raster.crs = Crs::WGS84;
        let out = reproject(&raster, &Crs::WGS84).unwrap();
        assert_eq!(out.data, raster.data);
        assert_eq!(out.transform, raster.transform);
    }

    #[test]
    fn test_utm_to_geographic_extent() {
        let out = reproject(&utm_raster(), &Crs::WGS84).unwrap();
        assert_eq!(out.crs, Crs::WGS84);
        let (min_x, min_y, max_x, max_y) = out.extent();
        assert!(min_x > 14.8 && min_x < 14.9, "min lon {}", min_x);
        assert!(max_x > 15.1 && max_x < 15.2, "max lon {}", max_x);
        assert!(min_y > 51.9 && max_y < 52.1, "lat range {}..{}", min_y, max_y);
        assert!(out.width() > 0 && out.height() > 0);
        // Interior values come from the source grid.
        let center = out.data[[out.height() / 2, out.width() / 2]];
        assert!(center > 0.0 && center < 200.0);
    }

    #[test]
    fn test_lambert_to_geographic_extent() {
        use crate::projection::{CustomProjection, Ellipsoid, ProjectionMethod};

        // 1 km WRF-Hydro style grid centered on the projection origin
        let lambert = CustomProjection {
            standard_parallel_1: 30.0,
            standard_parallel_2: 60.0,
            origin_latitude: 40.0,
            origin_longitude: -97.0,
            ..CustomProjection::new(
                ProjectionMethod::LambertConformalConic2SP,
                Ellipsoid::sphere(6_370_000.0),
            )
        };
        let raster = Raster {
            transform: GeoTransform {
                origin_x: -10_000.0,
                origin_y: 5_000.0,
                pixel_width: 1_000.0,
                pixel_height: -1_000.0,
            },
            crs: Crs::Custom(lambert),
            ..utm_raster()
        };

        let out = reproject(&raster, &Crs::WGS84).unwrap();
        assert_eq!(out.crs, Crs::WGS84);
        let (min_x, min_y, max_x, max_y) = out.extent();
        assert!(min_x > -97.2 && min_x < -97.05, "min lon {}", min_x);
        assert!(max_x > -96.95 && max_x < -96.8, "max lon {}", max_x);
        assert!(min_y > 39.9 && min_y < 40.0, "min lat {}", min_y);
        assert!(max_y > 40.0 && max_y < 40.1, "max lat {}", max_y);
        let center = out.data[[out.height() / 2, out.width() / 2]];
        assert!(center > 0.0 && center < 200.0);
    }

    #[test]
    fn test_unsupported_source_crs() {
        let mut raster = utm_raster();
        raster.crs = Crs::Epsg(crate::projection::USER_DEFINED);
        assert!(matches!(
            reproject(&raster, &Crs::WGS84),
            Err(OverlayError::Projection { .. })
        ));
    }

    #[test]
    fn test_reproject_file_leaves_no_partial_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out.tif");
        let result = reproject_file(&dir.path().join("missing.tif"), &destination);
        assert!(result.is_err());
        assert!(!destination.exists());
    }
}
