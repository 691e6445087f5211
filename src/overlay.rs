//! Raster overlay pipeline.
//!
//! Takes a GeoTIFF through reprojection to EPSG:4326, styled PNG rendering
//! and placement on a map at the bounds of a boundary polygon. Each call
//! adds a new overlay layer; nothing is deduplicated.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::boundary::Boundary;
use crate::config::Config;
use crate::error::{OverlayError, Result};
use crate::logging::{log_error, log_operation_end, log_operation_start, log_timed_operation};
use crate::map::{ImageOverlay, Layer, MapWidget};
use crate::render::{render_band_to_png, CanvasSize};
use crate::reproject::reproject_file;
use crate::style::{resolve_style, StyleSpec};

/// Folder under the output root receiving reprojected rasters and PNGs
pub const OUTPUT_SUBFOLDER: &str = "Raster_Outputs_Prj";

/// Conventional URL prefix for rendered PNGs in the training notebook server
pub const DEFAULT_URL_PREFIX: &str = "files/GIS_Training/Outputs/Raster_Outputs_Prj";

/// One overlay request: which raster, and where outputs go
#[derive(Debug, Clone)]
pub struct RasterOverlayRequest {
    pub source_raster: PathBuf,
    pub output_folder: PathBuf,
}

impl RasterOverlayRequest {
    pub fn new(source_raster: impl Into<PathBuf>, output_folder: impl Into<PathBuf>) -> Self {
        Self {
            source_raster: source_raster.into(),
            output_folder: output_folder.into(),
        }
    }
}

/// Knobs for the overlay pipeline
#[derive(Debug, Clone)]
pub struct OverlayOptions {
    pub subfolder: String,
    pub url_prefix: String,
    pub canvas: CanvasSize,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            subfolder: OUTPUT_SUBFOLDER.to_string(),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            canvas: CanvasSize::default(),
        }
    }
}

impl From<&Config> for OverlayOptions {
    fn from(config: &Config) -> Self {
        Self {
            subfolder: config.output.subfolder.clone(),
            url_prefix: config.output.url_prefix.clone(),
            canvas: config.canvas_size(),
        }
    }
}

/// What one pipeline run produced
#[derive(Debug, Clone)]
pub struct OverlayOutcome {
    pub reprojected: PathBuf,
    pub png: PathBuf,
    pub style: StyleSpec,
    pub overlay: ImageOverlay,
    pub image_size: (u32, u32),
}

/// Create `<root>/<subfolder>` if it does not exist yet
pub fn ensure_output_dir(root: &Path, subfolder: &str) -> Result<PathBuf> {
    let dir = root.join(subfolder);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Variable name for a raster file: its name without the `.tif`/`.tiff` suffix
pub fn variable_name(path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| OverlayError::InvalidParameter {
            param: "raster".to_string(),
            message: format!("{} has no usable file name", path.display()),
        })?;
    let bytes = file_name.as_bytes();
    let has_suffix = |suffix: &[u8]| {
        bytes.len() >= suffix.len() && bytes[bytes.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    };
    let stem_len = if has_suffix(b".tiff") {
        bytes.len() - 5
    } else if has_suffix(b".tif") {
        bytes.len() - 4
    } else {
        bytes.len()
    };
    Ok(file_name[..stem_len].to_string())
}

/// Run the overlay pipeline with default options
pub fn show_raster_map(
    request: &RasterOverlayRequest,
    map: &mut MapWidget,
    boundary: &Boundary,
) -> Result<OverlayOutcome> {
    show_raster_map_with(request, map, boundary, &OverlayOptions::default())
}

/// Reproject, render and attach a raster overlay to `map`
pub fn show_raster_map_with(
    request: &RasterOverlayRequest,
    map: &mut MapWidget,
    boundary: &Boundary,
    options: &OverlayOptions,
) -> Result<OverlayOutcome> {
    let start = Instant::now();
    let source = request.source_raster.display().to_string();
    log_operation_start("show_raster_map", Some(&source));

    let result = run_pipeline(request, map, boundary, options);
    match &result {
        Ok(_) => log_operation_end("show_raster_map", start, true),
        Err(e) => {
            log_error(e, &source);
            log_operation_end("show_raster_map", start, false);
        }
    }
    result
}

fn run_pipeline(
    request: &RasterOverlayRequest,
    map: &mut MapWidget,
    boundary: &Boundary,
    options: &OverlayOptions,
) -> Result<OverlayOutcome> {
    let out_dir = ensure_output_dir(&request.output_folder, &options.subfolder)?;

    let file_name = request
        .source_raster
        .file_name()
        .ok_or_else(|| OverlayError::InvalidParameter {
            param: "raster".to_string(),
            message: format!("{} has no file name", request.source_raster.display()),
        })?;
    let reprojected_path = out_dir.join(file_name);
    let raster = log_timed_operation("reproject", || {
        reproject_file(&request.source_raster, &reprojected_path)
    })?;

    let name = variable_name(&reprojected_path)?;
    let style = resolve_style(&name);
    info!(variable = %name, style = %style.name, "Style resolved");

    let png_name = format!("{}.png", name);
    let png_path = out_dir.join(&png_name);
    let image_size = log_timed_operation("render", || {
        render_band_to_png(raster.data.view(), &style, options.canvas, &png_path)
    })?;

    let bounds = boundary.first_feature_bounds()?.to_overlay_bounds();

    let url = format!("{}/{}", options.url_prefix.trim_end_matches('/'), png_name);
    let overlay = ImageOverlay::new(url, bounds, name.clone());
    map.add_layer(Layer::ImageOverlay(overlay.clone()));

    info!(
        name = %name,
        url = %overlay.url,
        south = bounds[0][0],
        west = bounds[0][1],
        north = bounds[1][0],
        east = bounds[1][1],
        "Overlay attached"
    );

    Ok(OverlayOutcome {
        reprojected: reprojected_path,
        png: png_path,
        style,
        overlay,
        image_size,
    })
}
