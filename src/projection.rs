//! Coordinate reference systems and transforms.
//!
//! A CRS is either an EPSG code resolved from a built-in table, or a
//! user-defined projection described by GeoTIFF projection keys (the
//! Lambert grids produced by WRF-Hydro pre-processing are the usual case).
//! Both become PROJ strings transformed with `proj4rs`, so no system PROJ
//! installation is needed.

use std::fmt;

use proj4rs::Proj;

use crate::error::{OverlayError, Result};

/// WGS84 geographic coordinates
pub const EPSG_WGS84: u32 = 4326;
/// NAD83 geographic coordinates
pub const EPSG_NAD83: u32 = 4269;
/// NAD27 geographic coordinates
pub const EPSG_NAD27: u32 = 4267;
/// Spherical (Web) Mercator
pub const EPSG_WEB_MERCATOR: u32 = 3857;
/// NAD83 / Conus Albers
pub const EPSG_CONUS_ALBERS: u32 = 5070;
/// ETRS89 / LAEA Europe
pub const EPSG_LAEA_EUROPE: u32 = 3035;

/// GeoTIFF marker for a user-defined coordinate system
pub const USER_DEFINED: u32 = 32767;

/// Resolve an EPSG code to a PROJ string
pub fn proj_string(epsg: u32) -> Option<String> {
    let known = match epsg {
        EPSG_WGS84 => Some("+proj=longlat +datum=WGS84 +no_defs"),
        EPSG_NAD83 => Some("+proj=longlat +ellps=GRS80 +towgs84=0,0,0 +no_defs"),
        EPSG_NAD27 => Some("+proj=longlat +ellps=clrk66 +towgs84=-8,160,176 +no_defs"),
        EPSG_WEB_MERCATOR => Some(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +no_defs",
        ),
        EPSG_CONUS_ALBERS => Some(
            "+proj=aea +lat_0=23 +lon_0=-96 +lat_1=29.5 +lat_2=45.5 +x_0=0 +y_0=0 +ellps=GRS80 +towgs84=0,0,0 +units=m +no_defs",
        ),
        EPSG_LAEA_EUROPE => Some(
            "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 +towgs84=0,0,0 +units=m +no_defs",
        ),
        _ => None,
    };
    if let Some(s) = known {
        return Some(s.to_string());
    }

    match epsg {
        // WGS84 / UTM north and south
        32601..=32660 => Some(format!(
            "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs",
            epsg - 32600
        )),
        32701..=32760 => Some(format!(
            "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
            epsg - 32700
        )),
        // NAD83 / UTM
        26901..=26923 => Some(format!(
            "+proj=utm +zone={} +ellps=GRS80 +towgs84=0,0,0 +units=m +no_defs",
            epsg - 26900
        )),
        _ => None,
    }
}

/// Whether an EPSG code is a geographic (degree-based) CRS
pub fn is_geographic(epsg: u32) -> bool {
    matches!(epsg, EPSG_WGS84 | EPSG_NAD83 | EPSG_NAD27)
}

/// Projection method of a user-defined CRS, keyed by GeoTIFF `ProjCoordTransGeoKey`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMethod {
    TransverseMercator,
    Mercator,
    LambertConformalConic2SP,
    LambertConformalConic1SP,
    LambertAzimuthalEqualArea,
    AlbersEqualArea,
}

impl ProjectionMethod {
    pub fn from_geokey(code: u16) -> Option<Self> {
        match code {
            1 => Some(ProjectionMethod::TransverseMercator),
            7 => Some(ProjectionMethod::Mercator),
            8 => Some(ProjectionMethod::LambertConformalConic2SP),
            9 => Some(ProjectionMethod::LambertConformalConic1SP),
            10 => Some(ProjectionMethod::LambertAzimuthalEqualArea),
            11 => Some(ProjectionMethod::AlbersEqualArea),
            _ => None,
        }
    }

    pub fn geokey(self) -> u16 {
        match self {
            ProjectionMethod::TransverseMercator => 1,
            ProjectionMethod::Mercator => 7,
            ProjectionMethod::LambertConformalConic2SP => 8,
            ProjectionMethod::LambertConformalConic1SP => 9,
            ProjectionMethod::LambertAzimuthalEqualArea => 10,
            ProjectionMethod::AlbersEqualArea => 11,
        }
    }

    fn proj_name(self) -> &'static str {
        match self {
            ProjectionMethod::TransverseMercator => "tmerc",
            ProjectionMethod::Mercator => "merc",
            ProjectionMethod::LambertConformalConic2SP
            | ProjectionMethod::LambertConformalConic1SP => "lcc",
            ProjectionMethod::LambertAzimuthalEqualArea => "laea",
            ProjectionMethod::AlbersEqualArea => "aea",
        }
    }
}

/// Reference ellipsoid given by its axes in metres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub semi_major: f64,
    pub semi_minor: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major: 6_378_137.0,
        semi_minor: 6_356_752.314_245_179,
    };
    pub const GRS80: Ellipsoid = Ellipsoid {
        semi_major: 6_378_137.0,
        semi_minor: 6_356_752.314_140_356,
    };
    pub const CLARKE_1866: Ellipsoid = Ellipsoid {
        semi_major: 6_378_206.4,
        semi_minor: 6_356_583.8,
    };

    pub fn sphere(radius: f64) -> Self {
        Self {
            semi_major: radius,
            semi_minor: radius,
        }
    }

    pub fn from_inverse_flattening(semi_major: f64, inverse_flattening: f64) -> Self {
        if inverse_flattening == 0.0 {
            return Self::sphere(semi_major);
        }
        Self {
            semi_major,
            semi_minor: semi_major * (1.0 - 1.0 / inverse_flattening),
        }
    }

    /// Ellipsoid for an EPSG ellipsoid (70xx) or geographic CRS (4xxx) code
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            7030 | EPSG_WGS84 => Some(Self::WGS84),
            7019 | EPSG_NAD83 => Some(Self::GRS80),
            7008 | EPSG_NAD27 => Some(Self::CLARKE_1866),
            7047 => Some(Self::sphere(6_370_997.0)),
            7035 => Some(Self::sphere(6_371_000.0)),
            _ => None,
        }
    }

    pub fn is_sphere(&self) -> bool {
        self.semi_major == self.semi_minor
    }

    fn proj_params(&self) -> String {
        if self.is_sphere() {
            format!("+R={}", self.semi_major)
        } else {
            format!("+a={} +b={}", self.semi_major, self.semi_minor)
        }
    }
}

/// A projected CRS defined by its parameters rather than an EPSG code.
///
/// Angles are in degrees, offsets in the CRS's linear unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomProjection {
    pub method: ProjectionMethod,
    pub ellipsoid: Ellipsoid,
    pub standard_parallel_1: f64,
    pub standard_parallel_2: f64,
    pub origin_latitude: f64,
    pub origin_longitude: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    pub scale_factor: f64,
    /// Size of one linear unit in metres
    pub unit_to_meter: f64,
}

impl CustomProjection {
    /// Parameters with every value at its neutral default
    pub fn new(method: ProjectionMethod, ellipsoid: Ellipsoid) -> Self {
        Self {
            method,
            ellipsoid,
            standard_parallel_1: 0.0,
            standard_parallel_2: 0.0,
            origin_latitude: 0.0,
            origin_longitude: 0.0,
            false_easting: 0.0,
            false_northing: 0.0,
            scale_factor: 1.0,
            unit_to_meter: 1.0,
        }
    }

    pub fn to_proj_string(&self) -> String {
        let mut parts = vec![format!("+proj={}", self.method.proj_name())];
        match self.method {
            ProjectionMethod::LambertConformalConic2SP | ProjectionMethod::AlbersEqualArea => {
                parts.push(format!("+lat_1={}", self.standard_parallel_1));
                parts.push(format!("+lat_2={}", self.standard_parallel_2));
                parts.push(format!("+lat_0={}", self.origin_latitude));
            }
            ProjectionMethod::LambertConformalConic1SP => {
                parts.push(format!("+lat_1={}", self.origin_latitude));
                parts.push(format!("+lat_0={}", self.origin_latitude));
                parts.push(format!("+k_0={}", self.scale_factor));
            }
            ProjectionMethod::TransverseMercator => {
                parts.push(format!("+lat_0={}", self.origin_latitude));
                parts.push(format!("+k_0={}", self.scale_factor));
            }
            ProjectionMethod::Mercator => {
                parts.push(format!("+k_0={}", self.scale_factor));
            }
            ProjectionMethod::LambertAzimuthalEqualArea => {
                parts.push(format!("+lat_0={}", self.origin_latitude));
            }
        }
        parts.push(format!("+lon_0={}", self.origin_longitude));
        parts.push(format!("+x_0={}", self.false_easting * self.unit_to_meter));
        parts.push(format!("+y_0={}", self.false_northing * self.unit_to_meter));
        parts.push(self.ellipsoid.proj_params());
        if self.unit_to_meter == 1.0 {
            parts.push("+units=m".to_string());
        } else {
            parts.push(format!("+to_meter={}", self.unit_to_meter));
        }
        parts.push("+no_defs".to_string());
        parts.join(" ")
    }
}

/// Coordinate reference system of a raster
#[derive(Debug, Clone, PartialEq)]
pub enum Crs {
    Epsg(u32),
    Custom(CustomProjection),
}

impl Crs {
    pub const WGS84: Crs = Crs::Epsg(EPSG_WGS84);

    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::Custom(_) => None,
        }
    }

    /// Whether coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        match self {
            Crs::Epsg(code) => is_geographic(*code),
            Crs::Custom(_) => false,
        }
    }

    pub fn to_proj_string(&self) -> Result<String> {
        match self {
            Crs::Epsg(code) => proj_string(*code).ok_or_else(|| OverlayError::Projection {
                message: if *code == USER_DEFINED {
                    "user-defined coordinate system has no projection parameters".to_string()
                } else {
                    format!("EPSG:{} is not supported", code)
                },
            }),
            Crs::Custom(projection) => Ok(projection.to_proj_string()),
        }
    }

    fn to_proj(&self) -> Result<Proj> {
        let definition = self.to_proj_string()?;
        Proj::from_proj_string(&definition).map_err(|e| OverlayError::Projection {
            message: format!("invalid projection {}: {:?}", self, e),
        })
    }
}

impl From<u32> for Crs {
    fn from(epsg: u32) -> Self {
        Crs::Epsg(epsg)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::Custom(projection) => write!(f, "user-defined {}", projection.method.proj_name()),
        }
    }
}

/// Reusable transformer between two coordinate systems.
///
/// Geographic coordinates go in and come out in degrees; the radian
/// conversion `proj4rs` expects is handled here.
pub struct CoordTransformer {
    source: Proj,
    target: Proj,
    source_crs: Crs,
    target_crs: Crs,
}

impl std::fmt::Debug for CoordTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordTransformer")
            .field("source_crs", &self.source_crs)
            .field("target_crs", &self.target_crs)
            .finish_non_exhaustive()
    }
}

impl CoordTransformer {
    pub fn new(source_crs: &Crs, target_crs: &Crs) -> Result<Self> {
        Ok(Self {
            source: source_crs.to_proj()?,
            target: target_crs.to_proj()?,
            source_crs: source_crs.clone(),
            target_crs: target_crs.clone(),
        })
    }

    pub fn source_crs(&self) -> &Crs {
        &self.source_crs
    }

    pub fn target_crs(&self) -> &Crs {
        &self.target_crs
    }

    /// Transform a single coordinate pair
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let mut point = if self.source_crs.is_geographic() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        proj4rs::transform::transform(&self.source, &self.target, &mut point).map_err(|e| {
            OverlayError::Projection {
                message: format!(
                    "{} -> {} failed at ({}, {}): {:?}",
                    self.source_crs, self.target_crs, x, y, e
                ),
            }
        })?;

        if !point.0.is_finite() || !point.1.is_finite() {
            return Err(OverlayError::Projection {
                message: format!("non-finite result transforming ({}, {})", x, y),
            });
        }

        if self.target_crs.is_geographic() {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lambert grid used by WRF-Hydro domains over the central US
    fn wrf_lambert() -> CustomProjection {
        CustomProjection {
            standard_parallel_1: 30.0,
            standard_parallel_2: 60.0,
            origin_latitude: 40.0,
            origin_longitude: -97.0,
            ..CustomProjection::new(
                ProjectionMethod::LambertConformalConic2SP,
                Ellipsoid::sphere(6_370_000.0),
            )
        }
    }

    #[test]
    fn test_proj_string_table() {
        assert!(proj_string(EPSG_WGS84).is_some());
        assert!(proj_string(32633).unwrap().contains("+zone=33"));
        assert!(proj_string(32733).unwrap().contains("+south"));
        assert!(proj_string(26915).unwrap().contains("+zone=15"));
        assert!(proj_string(USER_DEFINED).is_none());
        assert!(proj_string(2000).is_none());
    }

    #[test]
    fn test_identity_transform() {
        let t = CoordTransformer::new(&Crs::WGS84, &Crs::WGS84).unwrap();
        let (lon, lat) = t.transform(-105.5, 40.25).unwrap();
        assert!((lon + 105.5).abs() < 1e-9);
        assert!((lat - 40.25).abs() < 1e-9);
    }

    #[test]
    fn test_utm_round_trip() {
        // Central meridian of zone 33 is 15°E; easting there is 500 km.
        let to_utm = CoordTransformer::new(&Crs::WGS84, &Crs::Epsg(32633)).unwrap();
        let (x, y) = to_utm.transform(15.0, 52.0).unwrap();
        assert!((x - 500_000.0).abs() < 1.0);
        assert!(y > 5_700_000.0 && y < 5_800_000.0);

        let back = CoordTransformer::new(&Crs::Epsg(32633), &Crs::WGS84).unwrap();
        let (lon, lat) = back.transform(x, y).unwrap();
        assert!((lon - 15.0).abs() < 1e-6);
        assert!((lat - 52.0).abs() < 1e-6);
    }

    #[test]
    fn test_lambert_proj_string() {
        let definition = wrf_lambert().to_proj_string();
        assert!(definition.starts_with("+proj=lcc"));
        assert!(definition.contains("+lat_1=30"));
        assert!(definition.contains("+lat_2=60"));
        assert!(definition.contains("+lon_0=-97"));
        assert!(definition.contains("+R=6370000"));
    }

    #[test]
    fn test_lambert_origin_maps_to_zero() {
        let crs = Crs::Custom(wrf_lambert());
        let back = CoordTransformer::new(&crs, &Crs::WGS84).unwrap();
        let (lon, lat) = back.transform(0.0, 0.0).unwrap();
        assert!((lon + 97.0).abs() < 1e-6, "lon {}", lon);
        assert!((lat - 40.0).abs() < 1e-6, "lat {}", lat);

        // 100 km east of the origin stays on the 40°N side and moves east
        let (lon, lat) = back.transform(100_000.0, 0.0).unwrap();
        assert!(lon > -96.0 && lon < -95.5, "lon {}", lon);
        assert!(lat > 39.9 && lat < 40.0, "lat {}", lat);
    }

    #[test]
    fn test_ellipsoid_codes() {
        assert_eq!(Ellipsoid::from_epsg(7030), Some(Ellipsoid::WGS84));
        assert_eq!(Ellipsoid::from_epsg(EPSG_NAD83), Some(Ellipsoid::GRS80));
        assert!(Ellipsoid::from_epsg(7035).unwrap().is_sphere());
        assert_eq!(Ellipsoid::from_epsg(1234), None);
        let wgs = Ellipsoid::from_inverse_flattening(6_378_137.0, 298.257_223_563);
        assert!((wgs.semi_minor - Ellipsoid::WGS84.semi_minor).abs() < 1e-6);
    }

    #[test]
    fn test_user_defined_without_parameters() {
        let err = CoordTransformer::new(&Crs::Epsg(USER_DEFINED), &Crs::WGS84).unwrap_err();
        assert!(err.to_string().contains("user-defined"));
    }
}
