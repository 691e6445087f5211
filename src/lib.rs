//! # rasteroverlay
//!
//! Reproject GeoTIFF rasters to geographic coordinates, render them with a
//! colormap chosen from the variable name, and overlay them on Leaflet maps.
//!
//! ## Key Features
//!
//! - **Variable-aware styling**: categorical grids (land use, flow direction,
//!   stream order) get fixed palettes with boundary normalization, terrain
//!   and coordinate grids get matching gradients
//! - **Pure-Rust raster pipeline**: GeoTIFF I/O via `tiff`, reprojection via
//!   `proj4rs`, PNG output via `image`
//! - **Map documents**: JSON-persistable Leaflet maps with overlays and
//!   controls, exportable as standalone HTML
//!
//! ## Architecture
//!
//! - **Style**: variable name to [`StyleSpec`] lookup
//! - **Raster**: GeoTIFF read/write and warp to EPSG:4326
//! - **Render**: scoped canvas drawing a band into a transparent PNG
//! - **Map**: [`MapWidget`] factory, layers and controls
//! - **Overlay**: the end-to-end [`show_raster_map`] pipeline

pub mod boundary;
pub mod colormaps;
pub mod config;
pub mod error;
pub mod geotiff;
pub mod logging;
pub mod map;
pub mod overlay;
pub mod projection;
pub mod render;
pub mod reproject;
pub mod style;

pub use boundary::{Boundary, BoundingBox};
pub use config::Config;
pub use error::{OverlayError, Result};
pub use logging::{init_tracing, log_error, log_operation_end, log_operation_start, log_timed_operation};
pub use map::{create_map, create_map_with, Control, ImageOverlay, Layer, MapWidget, Position};
pub use overlay::{show_raster_map, show_raster_map_with, OverlayOptions, OverlayOutcome, RasterOverlayRequest};
pub use projection::Crs;
pub use render::CanvasSize;
pub use style::{resolve_style, ColorMapping, GradientKind, Normalization, StyleSpec};
