//! GeoTIFF reading and writing.
//!
//! Only what the overlay workflow needs: band 1 as `f32`, a north-up affine
//! transform, the coordinate system from the GeoKey directory and the GDAL
//! no-data value. Output rasters are single-band 32-bit float GeoTIFFs.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::Path;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::{debug, info, warn};

use crate::error::{OverlayError, Result};
use crate::projection::{
    Crs, CustomProjection, Ellipsoid, ProjectionMethod, EPSG_WGS84, USER_DEFINED,
};

/// Where a GeoKey value lives when it is not stored inline
const GEO_DOUBLE_PARAMS_LOCATION: u16 = 34736;

// GeoKey IDs
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const GEOG_ELLIPSOID_GEO_KEY: u16 = 2056;
const GEOG_SEMI_MAJOR_AXIS_GEO_KEY: u16 = 2057;
const GEOG_SEMI_MINOR_AXIS_GEO_KEY: u16 = 2058;
const GEOG_INV_FLATTENING_GEO_KEY: u16 = 2059;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;
const PROJ_COORD_TRANS_GEO_KEY: u16 = 3075;
const PROJ_LINEAR_UNITS_GEO_KEY: u16 = 3076;
const PROJ_LINEAR_UNIT_SIZE_GEO_KEY: u16 = 3077;
const PROJ_STD_PARALLEL1_GEO_KEY: u16 = 3078;
const PROJ_STD_PARALLEL2_GEO_KEY: u16 = 3079;
const PROJ_NAT_ORIGIN_LONG_GEO_KEY: u16 = 3080;
const PROJ_NAT_ORIGIN_LAT_GEO_KEY: u16 = 3081;
const PROJ_FALSE_EASTING_GEO_KEY: u16 = 3082;
const PROJ_FALSE_NORTHING_GEO_KEY: u16 = 3083;
const PROJ_FALSE_ORIGIN_LONG_GEO_KEY: u16 = 3084;
const PROJ_FALSE_ORIGIN_LAT_GEO_KEY: u16 = 3085;
const PROJ_FALSE_ORIGIN_EASTING_GEO_KEY: u16 = 3086;
const PROJ_FALSE_ORIGIN_NORTHING_GEO_KEY: u16 = 3087;
const PROJ_CENTER_LONG_GEO_KEY: u16 = 3088;
const PROJ_CENTER_LAT_GEO_KEY: u16 = 3089;
const PROJ_CENTER_EASTING_GEO_KEY: u16 = 3090;
const PROJ_CENTER_NORTHING_GEO_KEY: u16 = 3091;
const PROJ_SCALE_AT_NAT_ORIGIN_GEO_KEY: u16 = 3092;
const PROJ_SCALE_AT_CENTER_GEO_KEY: u16 = 3093;

// GeoKey values
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const LINEAR_METER: u16 = 9001;
const LINEAR_FOOT: u16 = 9002;
const LINEAR_FOOT_US_SURVEY: u16 = 9003;

/// North-up affine transform from pixel to model coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// X of the upper-left corner of the upper-left pixel
    pub origin_x: f64,
    /// Y of the upper-left corner of the upper-left pixel
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Negative for north-up rasters
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Convert fractional pixel coordinates to model coordinates
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Convert model coordinates to fractional pixel coordinates
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }
}

/// A single-band georeferenced raster
#[derive(Debug, Clone)]
pub struct Raster {
    /// Band values indexed `[row, col]`, row 0 at the top
    pub data: Array2<f32>,
    pub transform: GeoTransform,
    pub crs: Crs,
    pub nodata: Option<f64>,
}

impl Raster {
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Model-space extent as `(min_x, min_y, max_x, max_y)`
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.transform.pixel_to_geo(0.0, 0.0);
        let (x1, y1) = self
            .transform
            .pixel_to_geo(self.width() as f64, self.height() as f64);
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

/// Read band 1 and georeferencing from a GeoTIFF file
pub fn read_geotiff(path: &Path) -> Result<Raster> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;

    let (width, height) = decoder.dimensions()?;
    let samples_per_pixel = match decoder.find_tag(Tag::SamplesPerPixel)? {
        Some(value) => value.into_u16()? as usize,
        None => 1,
    };

    let transform = read_transform(&mut decoder)?;
    let geokeys = read_geokeys(&mut decoder)?;
    let crs = geokeys.crs()?;
    let nodata = read_nodata(&mut decoder)?;

    let transform = if geokeys.raster_type() == RASTER_PIXEL_IS_POINT {
        GeoTransform {
            origin_x: transform.origin_x - transform.pixel_width / 2.0,
            origin_y: transform.origin_y - transform.pixel_height / 2.0,
            ..transform
        }
    } else {
        transform
    };

    let samples = to_f32(decoder.read_image()?)?;
    let pixel_count = width as usize * height as usize;
    let band: Vec<f32> = if samples_per_pixel > 1 {
        samples.into_iter().step_by(samples_per_pixel).collect()
    } else {
        samples
    };
    if band.len() != pixel_count {
        return Err(OverlayError::UnsupportedRaster {
            message: format!(
                "expected {} samples in band 1, decoded {}",
                pixel_count,
                band.len()
            ),
        });
    }

    let data = Array2::from_shape_vec((height as usize, width as usize), band).map_err(|e| {
        OverlayError::UnsupportedRaster {
            message: format!("band shape mismatch: {}", e),
        }
    })?;

    debug!(
        path = %path.display(),
        width = width,
        height = height,
        crs = %crs,
        nodata = ?nodata,
        "GeoTIFF loaded"
    );

    Ok(Raster {
        data,
        transform,
        crs,
        nodata,
    })
}

/// Write a raster as a single-band float GeoTIFF
pub fn write_geotiff(raster: &Raster, path: &Path) -> Result<()> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(OverlayError::UnsupportedRaster {
            message: "raster has zero dimensions".to_string(),
        });
    }
    let (geokeys, geodoubles) = build_geokey_directory(&raster.crs)?;

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut image = encoder.new_image::<Gray32Float>(raster.width() as u32, raster.height() as u32)?;

    let t = &raster.transform;
    let dir = image.encoder();
    let pixel_scale = [t.pixel_width, -t.pixel_height, 0.0];
    dir.write_tag(Tag::ModelPixelScaleTag, &pixel_scale[..])?;
    let tiepoint = [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0];
    dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    dir.write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;
    if !geodoubles.is_empty() {
        dir.write_tag(Tag::GeoDoubleParamsTag, &geodoubles[..])?;
    }
    if let Some(nodata) = raster.nodata {
        let text = format!("{}", nodata);
        dir.write_tag(Tag::GdalNodata, text.as_str())?;
    }

    let pixels: Vec<f32> = raster.data.iter().copied().collect();
    image.write_data(&pixels)?;

    info!(
        path = %path.display(),
        width = raster.width(),
        height = raster.height(),
        crs = %raster.crs,
        "GeoTIFF written"
    );
    Ok(())
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    if let Some(value) = decoder.find_tag(Tag::ModelTransformationTag)? {
        let m = value.into_f64_vec()?;
        if m.len() < 8 {
            return Err(OverlayError::UnsupportedRaster {
                message: "ModelTransformation tag is truncated".to_string(),
            });
        }
        if m[1] != 0.0 || m[4] != 0.0 {
            return Err(OverlayError::UnsupportedRaster {
                message: "rotated rasters are not supported".to_string(),
            });
        }
        return Ok(GeoTransform {
            origin_x: m[3],
            origin_y: m[7],
            pixel_width: m[0],
            pixel_height: m[5],
        });
    }

    let scale = decoder.find_tag(Tag::ModelPixelScaleTag)?;
    let tiepoint = decoder.find_tag(Tag::ModelTiepointTag)?;
    match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) => {
            let scale = scale.into_f64_vec()?;
            let tie = tiepoint.into_f64_vec()?;
            if scale.len() < 2 || tie.len() < 6 {
                return Err(OverlayError::UnsupportedRaster {
                    message: "pixel scale or tiepoint tag is truncated".to_string(),
                });
            }
            Ok(GeoTransform {
                origin_x: tie[3] - tie[0] * scale[0],
                origin_y: tie[4] + tie[1] * scale[1],
                pixel_width: scale[0],
                pixel_height: -scale[1],
            })
        }
        _ => Err(OverlayError::UnsupportedRaster {
            message: "raster has no georeferencing tags".to_string(),
        }),
    }
}

fn read_geokeys<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoKeys> {
    let directory = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
        Some(value) => value.into_u16_vec()?,
        None => {
            return Err(OverlayError::UnsupportedRaster {
                message: "raster has no GeoKey directory".to_string(),
            })
        }
    };
    let doubles = match decoder.find_tag(Tag::GeoDoubleParamsTag)? {
        Some(value) => value.into_f64_vec()?,
        None => Vec::new(),
    };
    Ok(GeoKeys::parse(&directory, &doubles))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>> {
    let Some(value) = decoder.find_tag(Tag::GdalNodata)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    let parsed = text.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse::<f64>();
    Ok(parsed.ok())
}

/// Decoded GeoKey directory: inline SHORT keys and keys stored in GeoDoubleParams
#[derive(Debug, Default)]
struct GeoKeys {
    shorts: HashMap<u16, u16>,
    doubles: HashMap<u16, f64>,
}

impl GeoKeys {
    fn parse(directory: &[u16], doubles: &[f64]) -> Self {
        let mut keys = GeoKeys::default();
        for entry in directory.chunks_exact(4).skip(1) {
            let (key, location, count, value) = (entry[0], entry[1], entry[2], entry[3]);
            match location {
                0 => {
                    keys.shorts.insert(key, value);
                }
                GEO_DOUBLE_PARAMS_LOCATION if count >= 1 => {
                    if let Some(v) = doubles.get(value as usize) {
                        keys.doubles.insert(key, *v);
                    }
                }
                // ASCII citations carry nothing the transform needs
                _ => {}
            }
        }
        keys
    }

    fn short(&self, key: u16) -> Option<u16> {
        self.shorts.get(&key).copied()
    }

    /// First of `keys` present as a double
    fn double(&self, keys: &[u16]) -> Option<f64> {
        keys.iter().find_map(|key| self.doubles.get(key).copied())
    }

    fn raster_type(&self) -> u16 {
        self.short(GT_RASTER_TYPE_GEO_KEY)
            .unwrap_or(RASTER_PIXEL_IS_AREA)
    }

    fn crs(&self) -> Result<Crs> {
        let model_type = self.short(GT_MODEL_TYPE_GEO_KEY);
        match self.short(PROJECTED_CS_TYPE_GEO_KEY) {
            Some(code) if code as u32 != USER_DEFINED => return Ok(Crs::Epsg(code as u32)),
            Some(_) => return self.custom_projection().map(Crs::Custom),
            None if model_type == Some(MODEL_TYPE_PROJECTED) => {
                if self.short(PROJ_COORD_TRANS_GEO_KEY).is_some() {
                    return self.custom_projection().map(Crs::Custom);
                }
                return Ok(Crs::Epsg(USER_DEFINED));
            }
            None => {}
        }

        match self.short(GEOGRAPHIC_TYPE_GEO_KEY) {
            Some(code) if code as u32 != USER_DEFINED => Ok(Crs::Epsg(code as u32)),
            Some(_) => {
                warn!("Treating user-defined geographic coordinates as WGS84");
                Ok(Crs::Epsg(EPSG_WGS84))
            }
            None if model_type == Some(MODEL_TYPE_GEOGRAPHIC) => Ok(Crs::Epsg(EPSG_WGS84)),
            None => Ok(Crs::Epsg(USER_DEFINED)),
        }
    }

    fn ellipsoid(&self) -> Ellipsoid {
        if let Some(a) = self.double(&[GEOG_SEMI_MAJOR_AXIS_GEO_KEY]) {
            if let Some(b) = self.double(&[GEOG_SEMI_MINOR_AXIS_GEO_KEY]) {
                return Ellipsoid {
                    semi_major: a,
                    semi_minor: b,
                };
            }
            if let Some(rf) = self.double(&[GEOG_INV_FLATTENING_GEO_KEY]) {
                return Ellipsoid::from_inverse_flattening(a, rf);
            }
            return Ellipsoid::sphere(a);
        }
        [GEOG_ELLIPSOID_GEO_KEY, GEOGRAPHIC_TYPE_GEO_KEY]
            .iter()
            .filter_map(|key| self.short(*key))
            .find_map(|code| Ellipsoid::from_epsg(code as u32))
            .unwrap_or(Ellipsoid::WGS84)
    }

    fn custom_projection(&self) -> Result<CustomProjection> {
        let method = self
            .short(PROJ_COORD_TRANS_GEO_KEY)
            .and_then(ProjectionMethod::from_geokey)
            .ok_or_else(|| OverlayError::Projection {
                message: format!(
                    "user-defined coordinate system with unsupported coordinate transformation {:?}",
                    self.short(PROJ_COORD_TRANS_GEO_KEY)
                ),
            })?;

        let unit_to_meter = match self.short(PROJ_LINEAR_UNITS_GEO_KEY) {
            None | Some(LINEAR_METER) => 1.0,
            Some(LINEAR_FOOT) => 0.3048,
            Some(LINEAR_FOOT_US_SURVEY) => 1200.0 / 3937.0,
            Some(code) => self
                .double(&[PROJ_LINEAR_UNIT_SIZE_GEO_KEY])
                .ok_or_else(|| OverlayError::Projection {
                    message: format!("unsupported linear unit {}", code),
                })?,
        };

        let standard_parallel_1 = self.double(&[PROJ_STD_PARALLEL1_GEO_KEY]).unwrap_or(0.0);
        let projection = CustomProjection {
            method,
            ellipsoid: self.ellipsoid(),
            standard_parallel_1,
            standard_parallel_2: self
                .double(&[PROJ_STD_PARALLEL2_GEO_KEY])
                .unwrap_or(standard_parallel_1),
            origin_latitude: self
                .double(&[
                    PROJ_NAT_ORIGIN_LAT_GEO_KEY,
                    PROJ_FALSE_ORIGIN_LAT_GEO_KEY,
                    PROJ_CENTER_LAT_GEO_KEY,
                ])
                .unwrap_or(0.0),
            origin_longitude: self
                .double(&[
                    PROJ_NAT_ORIGIN_LONG_GEO_KEY,
                    PROJ_FALSE_ORIGIN_LONG_GEO_KEY,
                    PROJ_CENTER_LONG_GEO_KEY,
                ])
                .unwrap_or(0.0),
            false_easting: self
                .double(&[
                    PROJ_FALSE_EASTING_GEO_KEY,
                    PROJ_FALSE_ORIGIN_EASTING_GEO_KEY,
                    PROJ_CENTER_EASTING_GEO_KEY,
                ])
                .unwrap_or(0.0),
            false_northing: self
                .double(&[
                    PROJ_FALSE_NORTHING_GEO_KEY,
                    PROJ_FALSE_ORIGIN_NORTHING_GEO_KEY,
                    PROJ_CENTER_NORTHING_GEO_KEY,
                ])
                .unwrap_or(0.0),
            scale_factor: self
                .double(&[PROJ_SCALE_AT_NAT_ORIGIN_GEO_KEY, PROJ_SCALE_AT_CENTER_GEO_KEY])
                .unwrap_or(1.0),
            unit_to_meter,
        };
        debug!(projection = %projection.to_proj_string(), "User-defined projection decoded");
        Ok(projection)
    }
}

/// GeoKey directory and GeoDoubleParams for a CRS
fn build_geokey_directory(crs: &Crs) -> Result<(Vec<u16>, Vec<f64>)> {
    let mut shorts: Vec<(u16, u16)> = vec![(GT_RASTER_TYPE_GEO_KEY, RASTER_PIXEL_IS_AREA)];
    let mut doubles: Vec<(u16, f64)> = Vec::new();

    match crs {
        Crs::Epsg(code) => {
            let code_u16 = u16::try_from(*code).map_err(|_| OverlayError::Projection {
                message: format!("EPSG:{} does not fit a GeoKey", code),
            })?;
            if crs.is_geographic() {
                shorts.push((GT_MODEL_TYPE_GEO_KEY, MODEL_TYPE_GEOGRAPHIC));
                shorts.push((GEOGRAPHIC_TYPE_GEO_KEY, code_u16));
            } else {
                shorts.push((GT_MODEL_TYPE_GEO_KEY, MODEL_TYPE_PROJECTED));
                shorts.push((PROJECTED_CS_TYPE_GEO_KEY, code_u16));
            }
        }
        Crs::Custom(p) => {
            shorts.push((GT_MODEL_TYPE_GEO_KEY, MODEL_TYPE_PROJECTED));
            shorts.push((GEOGRAPHIC_TYPE_GEO_KEY, USER_DEFINED as u16));
            shorts.push((PROJECTED_CS_TYPE_GEO_KEY, USER_DEFINED as u16));
            shorts.push((PROJ_COORD_TRANS_GEO_KEY, p.method.geokey()));
            if p.unit_to_meter == 1.0 {
                shorts.push((PROJ_LINEAR_UNITS_GEO_KEY, LINEAR_METER));
            } else {
                shorts.push((PROJ_LINEAR_UNITS_GEO_KEY, USER_DEFINED as u16));
                doubles.push((PROJ_LINEAR_UNIT_SIZE_GEO_KEY, p.unit_to_meter));
            }
            doubles.extend([
                (GEOG_SEMI_MAJOR_AXIS_GEO_KEY, p.ellipsoid.semi_major),
                (GEOG_SEMI_MINOR_AXIS_GEO_KEY, p.ellipsoid.semi_minor),
                (PROJ_STD_PARALLEL1_GEO_KEY, p.standard_parallel_1),
                (PROJ_STD_PARALLEL2_GEO_KEY, p.standard_parallel_2),
                (PROJ_NAT_ORIGIN_LONG_GEO_KEY, p.origin_longitude),
                (PROJ_NAT_ORIGIN_LAT_GEO_KEY, p.origin_latitude),
                (PROJ_FALSE_EASTING_GEO_KEY, p.false_easting),
                (PROJ_FALSE_NORTHING_GEO_KEY, p.false_northing),
                (PROJ_SCALE_AT_NAT_ORIGIN_GEO_KEY, p.scale_factor),
            ]);
        }
    }

    // Entries must be sorted by key
    let mut entries: Vec<[u16; 4]> = shorts
        .into_iter()
        .map(|(key, value)| [key, 0, 1, value])
        .collect();
    let mut params = Vec::with_capacity(doubles.len());
    for (key, value) in doubles {
        entries.push([key, GEO_DOUBLE_PARAMS_LOCATION, 1, params.len() as u16]);
        params.push(value);
    }
    entries.sort_by_key(|entry| entry[0]);

    let mut directory = vec![1, 1, 0, entries.len() as u16];
    for entry in entries {
        directory.extend_from_slice(&entry);
    }
    Ok((directory, params))
}

#[allow(unreachable_patterns)]
fn to_f32(data: DecodingResult) -> Result<Vec<f32>> {
    match data {
        DecodingResult::U8(values) => Ok(values.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U16(values) => Ok(values.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U32(values) => Ok(values.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U64(values) => Ok(values.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I8(values) => Ok(values.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I16(values) => Ok(values.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I32(values) => Ok(values.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I64(values) => Ok(values.into_iter().map(|v| v as f32).collect()),
        DecodingResult::F32(values) => Ok(values),
        DecodingResult::F64(values) => Ok(values.into_iter().map(|v| v as f32).collect()),
        _ => Err(OverlayError::UnsupportedRaster {
            message: "unsupported sample format".to_string(),
        }),
    }
}
