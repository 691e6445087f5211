//! Configuration management for rasteroverlay.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{OverlayError, Result};
use crate::render::CanvasSize;

/// Command-line arguments for rasteroverlay
#[derive(Parser, Debug)]
#[command(name = "rasteroverlay")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to JSON configuration file
    #[arg(short, long, global = true, env = "RASTEROVERLAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RASTEROVERLAY_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reproject a raster, render it and overlay it on a map
    Render(RenderArgs),
    /// Create a pre-configured map document
    Map(MapArgs),
    /// Print the display style resolved for a variable name
    Style {
        /// Variable name, e.g. landuse or FlowDirection
        name: String,
    },
}

#[derive(ClapArgs, Debug)]
pub struct RenderArgs {
    /// GeoTIFF to overlay
    pub raster: PathBuf,

    /// GeoJSON boundary; its first feature positions the overlay
    #[arg(short, long)]
    pub boundary: PathBuf,

    /// Output root; results go into its output subfolder
    #[arg(short, long, env = "RASTEROVERLAY_OUTPUT")]
    pub output: PathBuf,

    /// Map document to add the overlay to (created if missing)
    #[arg(short, long)]
    pub map: Option<PathBuf>,

    /// Also export the map as a Leaflet HTML page
    #[arg(long)]
    pub html: Option<PathBuf>,

    /// Render one pixel per raster cell instead of the figure size
    #[arg(long)]
    pub native: bool,

    /// Rendering resolution in dots per inch
    #[arg(long, env = "RASTEROVERLAY_DPI")]
    pub dpi: Option<f64>,

    /// URL prefix under which the PNG is served
    #[arg(long, env = "RASTEROVERLAY_URL_PREFIX")]
    pub url_prefix: Option<String>,

    /// Also draw the boundary outline on the map
    #[arg(long)]
    pub show_boundary: bool,
}

#[derive(ClapArgs, Debug)]
pub struct MapArgs {
    /// Center latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Center longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Zoom level
    #[arg(short, long)]
    pub zoom: f64,

    /// Where to write the map document
    #[arg(long)]
    pub out: PathBuf,

    /// Also export the map as a Leaflet HTML page
    #[arg(long)]
    pub html: Option<PathBuf>,
}

/// Output location configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Subfolder of the output root that receives reprojected rasters and PNGs
    #[serde(default = "default_subfolder")]
    pub subfolder: String,

    /// URL prefix under which rendered PNGs are reachable from the map
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
}

/// Rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_dpi")]
    pub dpi: f64,

    #[serde(default = "default_figure_width")]
    pub figure_width_in: f64,

    #[serde(default = "default_figure_height")]
    pub figure_height_in: f64,

    /// Render one pixel per cell, ignoring the figure size
    #[serde(default)]
    pub native: bool,
}

/// Map factory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Display width in pixels
    #[serde(default = "default_map_width")]
    pub width: u32,

    /// Display height in pixels
    #[serde(default = "default_map_height")]
    pub height: u32,

    #[serde(default = "default_basemap_name")]
    pub basemap_name: String,

    #[serde(default = "default_basemap_url")]
    pub basemap_url: String,

    #[serde(default = "default_basemap_attribution")]
    pub basemap_attribution: String,

    /// Zoom used when a map is created around a boundary
    #[serde(default = "default_zoom")]
    pub default_zoom: f64,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub map: MapConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load(args: &Args) -> Result<Self> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments (clap folds in the environment)
        if let Some(level) = &args.log_level {
            config.log_level = level.clone();
        }
        if let Command::Render(render) = &args.command {
            if let Some(dpi) = render.dpi {
                config.render.dpi = dpi;
            }
            if let Some(prefix) = &render.url_prefix {
                config.output.url_prefix = prefix.clone();
            }
            if render.native {
                config.render.native = true;
            }
        }

        Ok(config)
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.output = other.output;
        self.render = other.render;
        self.map = other.map;
        self.log_level = other.log_level;
    }

    /// Canvas size implied by the render settings
    pub fn canvas_size(&self) -> CanvasSize {
        if self.render.native {
            CanvasSize::Native
        } else {
            CanvasSize::Figure {
                width_in: self.render.figure_width_in,
                height_in: self.render.figure_height_in,
                dpi: self.render.dpi,
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.output.subfolder.trim().is_empty() {
            return Err(OverlayError::Config {
                message: "Output subfolder cannot be empty".to_string(),
            });
        }

        if self.output.url_prefix.trim().is_empty() {
            return Err(OverlayError::Config {
                message: "URL prefix cannot be empty".to_string(),
            });
        }

        for (name, value) in [
            ("render.dpi", self.render.dpi),
            ("render.figure_width_in", self.render.figure_width_in),
            ("render.figure_height_in", self.render.figure_height_in),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(OverlayError::Config {
                    message: format!("{} must be positive, got {}", name, value),
                });
            }
        }

        if self.map.width == 0 || self.map.height == 0 {
            return Err(OverlayError::Config {
                message: "Map width and height must be positive".to_string(),
            });
        }

        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(OverlayError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            render: RenderConfig::default(),
            map: MapConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            subfolder: default_subfolder(),
            url_prefix: default_url_prefix(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            figure_width_in: default_figure_width(),
            figure_height_in: default_figure_height(),
            native: false,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: default_map_width(),
            height: default_map_height(),
            basemap_name: default_basemap_name(),
            basemap_url: default_basemap_url(),
            basemap_attribution: default_basemap_attribution(),
            default_zoom: default_zoom(),
        }
    }
}

// Default value functions for serde
fn default_subfolder() -> String {
    crate::overlay::OUTPUT_SUBFOLDER.to_string()
}

fn default_url_prefix() -> String {
    crate::overlay::DEFAULT_URL_PREFIX.to_string()
}

fn default_dpi() -> f64 {
    500.0
}

fn default_figure_width() -> f64 {
    6.4
}

fn default_figure_height() -> f64 {
    4.8
}

fn default_map_width() -> u32 {
    950
}

fn default_map_height() -> u32 {
    750
}

fn default_basemap_name() -> String {
    "OpenStreetMap.Mapnik".to_string()
}

fn default_basemap_url() -> String {
    "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string()
}

fn default_basemap_attribution() -> String {
    "&copy; OpenStreetMap contributors".to_string()
}

fn default_zoom() -> f64 {
    9.0
}

fn default_log_level() -> String {
    "info".to_string()
}
