//! rasteroverlay - reproject, style and overlay GIS rasters on Leaflet maps
//!
//! This is the command-line entry point.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use rasteroverlay::config::{Args, Command, MapArgs, RenderArgs};
use rasteroverlay::{
    create_map_with, init_tracing, resolve_style, show_raster_map_with, Boundary, Config,
    MapWidget, OverlayOptions, RasterOverlayRequest,
};

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args).context("failed to load configuration")?;

    // Validate configuration
    config.validate().map_err(|e| {
        eprintln!("Invalid configuration: {}", e);
        e
    })?;

    init_tracing(&config.log_level);
    info!("Starting rasteroverlay v{}", env!("CARGO_PKG_VERSION"));

    let outcome = match &args.command {
        Command::Render(render) => run_render(render, &config),
        Command::Map(map) => run_map(map, &config),
        Command::Style { name } => run_style(name),
    };

    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    outcome
}

fn run_render(args: &RenderArgs, config: &Config) -> Result<()> {
    let boundary = Boundary::load(&args.boundary)
        .with_context(|| format!("failed to read boundary {}", args.boundary.display()))?;

    let mut map = match &args.map {
        Some(path) if path.exists() => MapWidget::load_json(path)
            .with_context(|| format!("failed to read map {}", path.display()))?,
        _ => {
            let bbox = boundary
                .first_feature_bounds()
                .context("cannot center a new map on the boundary")?;
            create_map_with(bbox.center(), config.map.default_zoom, &config.map)?
        }
    };

    if args.show_boundary {
        map.add_geojson_layer("boundary", boundary.to_geojson_value()?);
    }

    let request = RasterOverlayRequest::new(&args.raster, &args.output);
    let options = OverlayOptions::from(config);
    let outcome = show_raster_map_with(&request, &mut map, &boundary, &options)
        .with_context(|| format!("failed to overlay {}", args.raster.display()))?;

    info!(
        png = %outcome.png.display(),
        reprojected = %outcome.reprojected.display(),
        style = %outcome.style.name,
        "Overlay ready"
    );

    if let Some(path) = &args.map {
        map.save_json(path)
            .with_context(|| format!("failed to write map {}", path.display()))?;
    }
    if let Some(path) = &args.html {
        map.save_html(path)
            .with_context(|| format!("failed to write page {}", path.display()))?;
    }
    println!("{}", outcome.png.display());
    Ok(())
}

fn run_map(args: &MapArgs, config: &Config) -> Result<()> {
    let map = create_map_with((args.lat, args.lon), args.zoom, &config.map)?;
    map.save_json(&args.out)
        .with_context(|| format!("failed to write map {}", args.out.display()))?;
    if let Some(path) = &args.html {
        map.save_html(path)
            .with_context(|| format!("failed to write page {}", path.display()))?;
    }
    Ok(())
}

fn run_style(name: &str) -> Result<()> {
    let style = resolve_style(name);
    println!("{}", serde_json::to_string_pretty(&style)?);
    Ok(())
}
