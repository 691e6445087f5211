//! Test data generation utilities.
//!
//! This module writes small GeoTIFF rasters and GeoJSON boundaries with
//! known values for exercising the overlay pipeline.

#![allow(dead_code)]

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tiff::encoder::colortype::GrayI16;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use rasteroverlay::geotiff::{write_geotiff, GeoTransform, Raster};
use rasteroverlay::projection::Crs;
use rasteroverlay::Result;

/// A boundary whose only feature spans lon 10..15, lat 20..25
pub const BOUNDARY_10_20_15_25: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": {"name": "training basin"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[10, 20], [15, 20], [15, 25], [12, 24], [10, 25], [10, 20]]]
            }
        }
    ]
}"#;

/// A boundary collection with no features
pub const EMPTY_BOUNDARY: &str = r#"{"type": "FeatureCollection", "features": []}"#;

/// Creates a geographic raster covering lon 10..15, lat 20..25.
///
/// The top-left quarter holds values below the 0.1 cutoff; the rest ramps
/// from 1 upwards.
pub fn create_geographic_tif(path: &Path, size: (usize, usize)) -> Result<Raster> {
    let (cols, rows) = size;
    let data = Array2::from_shape_fn((rows, cols), |(r, c)| {
        if r < rows / 2 && c < cols / 2 {
            0.05
        } else {
            1.0 + (r * cols + c) as f32
        }
    });
    let raster = Raster {
        data,
        transform: GeoTransform {
            origin_x: 10.0,
            origin_y: 25.0,
            pixel_width: 5.0 / cols as f64,
            pixel_height: -5.0 / rows as f64,
        },
        crs: Crs::WGS84,
        nodata: None,
    };
    write_geotiff(&raster, path)?;
    Ok(raster)
}

/// Creates a 1 km UTM zone 33N raster near 15°E, 52°N filled with categories 1..=20
pub fn create_utm_landuse_tif(path: &Path) -> Result<Raster> {
    let data = Array2::from_shape_fn((10, 20), |(r, c)| ((r + c) % 20 + 1) as f32);
    let raster = Raster {
        data,
        transform: GeoTransform {
            origin_x: 490_000.0,
            origin_y: 5_765_000.0,
            pixel_width: 1_000.0,
            pixel_height: -1_000.0,
        },
        crs: Crs::Epsg(32633),
        nodata: Some(0.0),
    };
    write_geotiff(&raster, path)?;
    Ok(raster)
}

/// Writes a WRF-Hydro style streamorder grid the way GDAL lays it out.
///
/// 16-bit signed samples, a ModelTransformation matrix and a user-defined
/// Lambert Conformal Conic CRS on a 6370 km sphere, with its parameters
/// in GeoDoubleParams under the false-origin keys. The 1 km grid of 20 x 10
/// cells is centered on the projection origin (97°W, 40°N); stream orders
/// 1..=4 fill the grid with -9999 marking no-data along the top row.
pub fn write_gdal_lambert_tif(path: &Path) {
    let (cols, rows) = (20u32, 10u32);
    let values: Vec<i16> = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| if r == 0 { -9999 } else { (c % 4 + 1) as i16 }))
        .collect();

    let matrix = [
        1_000.0, 0.0, 0.0, -10_000.0, //
        0.0, -1_000.0, 0.0, 5_000.0, //
        0.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];
    let geokeys: [u16; 52] = [
        1, 1, 0, 12, //
        1024, 0, 1, 1, // projected model
        1025, 0, 1, 1, // pixel is area
        2048, 0, 1, 32767, // user-defined geographic CRS
        2057, 34736, 1, 0, // semi-major axis
        2058, 34736, 1, 1, // semi-minor axis
        3072, 0, 1, 32767, // user-defined projected CRS
        3075, 0, 1, 8, // Lambert Conformal Conic 2SP
        3076, 0, 1, 9001, // metres
        3078, 34736, 1, 2, // standard parallel 1
        3079, 34736, 1, 3, // standard parallel 2
        3084, 34736, 1, 4, // false origin longitude
        3085, 34736, 1, 5, // false origin latitude
    ];
    let doubles = [6_370_000.0, 6_370_000.0, 30.0, 60.0, -97.0, 40.0];

    let file = File::create(path).expect("failed to create Lambert fixture");
    let mut encoder = TiffEncoder::new(BufWriter::new(file)).expect("tiff encoder");
    let mut image = encoder.new_image::<GrayI16>(cols, rows).expect("tiff image");
    let dir = image.encoder();
    dir.write_tag(Tag::ModelTransformationTag, &matrix[..])
        .expect("transformation tag");
    dir.write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])
        .expect("geokey tag");
    dir.write_tag(Tag::GeoDoubleParamsTag, &doubles[..])
        .expect("geodouble tag");
    dir.write_tag(Tag::GdalNodata, "-9999").expect("nodata tag");
    image.write_data(&values).expect("tiff data");
}

/// Writes GeoJSON text to `dir/name` and returns the path
pub fn write_boundary(dir: &Path, name: &str, geojson: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, geojson).expect("failed to write boundary fixture");
    path
}
