//! Rendering raster bands to transparent PNGs.
//!
//! Drawing happens on a [`Canvas`] that lives only for the duration of one
//! render call. The canvas buffer is released when it goes out of scope, on
//! success and on every error path, so repeated renders never share state.

use std::cell::Cell;
use std::path::Path;
use std::time::Instant;

use image::{ImageBuffer, Rgba as Pixel, RgbaImage};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::colormaps::{Colormap, ListedColormap, Rgba, TRANSPARENT, UNDER_THRESHOLD};
use crate::error::{OverlayError, Result};
use crate::style::{ColorMapping, StyleSpec};

/// Horizontal share of a figure taken by its axes with default subplot margins
const AXES_WIDTH_FRACTION: f64 = 0.775;
/// Vertical share of a figure taken by its axes with default subplot margins
const AXES_HEIGHT_FRACTION: f64 = 0.77;

/// Upper bound on either canvas side
const MAX_CANVAS_SIDE: u32 = 20_000;

thread_local! {
    static LIVE_CANVASES: Cell<usize> = const { Cell::new(0) };
}

/// How large the rendered image is
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CanvasSize {
    /// Axes area of a figure of the given inches at the given DPI, cropped tight
    Figure {
        width_in: f64,
        height_in: f64,
        dpi: f64,
    },
    /// One pixel per raster cell
    Native,
    /// Explicit pixel dimensions
    Pixels { width: u32, height: u32 },
}

impl Default for CanvasSize {
    fn default() -> Self {
        CanvasSize::Figure {
            width_in: 6.4,
            height_in: 4.8,
            dpi: 500.0,
        }
    }
}

impl CanvasSize {
    /// Pixel dimensions for a band of `cols` x `rows` cells
    pub fn resolve(&self, cols: usize, rows: usize) -> Result<(u32, u32)> {
        let (width, height) = match *self {
            CanvasSize::Figure {
                width_in,
                height_in,
                dpi,
            } => (
                (width_in * dpi * AXES_WIDTH_FRACTION).round(),
                (height_in * dpi * AXES_HEIGHT_FRACTION).round(),
            ),
            CanvasSize::Native => (cols as f64, rows as f64),
            CanvasSize::Pixels { width, height } => (width as f64, height as f64),
        };

        if !(width >= 1.0 && height >= 1.0)
            || width > MAX_CANVAS_SIDE as f64
            || height > MAX_CANVAS_SIDE as f64
        {
            return Err(OverlayError::InvalidParameter {
                param: "canvas".to_string(),
                message: format!("canvas size {}x{} is out of range", width, height),
            });
        }
        Ok((width as u32, height as u32))
    }
}

/// Scoped drawing surface for a single render
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// Acquire a fully transparent canvas
    pub fn acquire(width: u32, height: u32) -> Self {
        LIVE_CANVASES.with(|live| live.set(live.get() + 1));
        debug!(width = width, height = height, "Canvas acquired");
        Self {
            image: ImageBuffer::from_pixel(width, height, Pixel(TRANSPARENT)),
        }
    }

    /// Number of canvases alive on the current thread
    pub fn live_count() -> usize {
        LIVE_CANVASES.with(|live| live.get())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Draw a band stretched over the whole canvas with nearest sampling.
    ///
    /// Row 0 of the band is drawn at the top of the canvas.
    pub fn draw_band(&mut self, band: ArrayView2<f32>, style: &StyleSpec) {
        let (rows, cols) = band.dim();
        if rows == 0 || cols == 0 {
            return;
        }
        let painter = Painter::new(band, style);
        let (width, height) = self.image.dimensions();

        for y in 0..height {
            let row = ((y as f64 + 0.5) * rows as f64 / height as f64) as usize;
            let row = row.min(rows - 1);
            for x in 0..width {
                let col = ((x as f64 + 0.5) * cols as f64 / width as f64) as usize;
                let col = col.min(cols - 1);
                let color = painter.paint(band[[row, col]]);
                self.image.put_pixel(x, y, Pixel(color));
            }
        }
    }

    /// Encode the canvas as PNG at `path`
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(OverlayError::from)
    }
}

impl Drop for Canvas {
    fn drop(&mut self) {
        LIVE_CANVASES.with(|live| live.set(live.get().saturating_sub(1)));
        debug!("Canvas released");
    }
}

/// Resolved per-value coloring for one band
enum Painter {
    Gradient {
        cmap: Box<dyn Colormap>,
        vmin: f32,
        vmax: f32,
    },
    Discrete(ListedColormap),
}

impl Painter {
    fn new(band: ArrayView2<f32>, style: &StyleSpec) -> Self {
        if let Some(listed) = style.listed_colormap() {
            return Painter::Discrete(listed);
        }
        let gradient = match &style.mapping {
            ColorMapping::Gradient { gradient } => *gradient,
            ColorMapping::Discrete { .. } => crate::style::GradientKind::Blues,
        };
        let vmax = band
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f32::NEG_INFINITY, f32::max);
        Painter::Gradient {
            cmap: gradient.colormap(),
            vmin: UNDER_THRESHOLD,
            vmax,
        }
    }

    fn paint(&self, value: f32) -> Rgba {
        if !value.is_finite() || value < UNDER_THRESHOLD {
            return TRANSPARENT;
        }
        match self {
            Painter::Gradient { cmap, vmin, vmax } => cmap.map(value, *vmin, *vmax),
            Painter::Discrete(listed) => listed.map_value(value as f64),
        }
    }
}

/// Render a band with a style and save it as a transparent PNG.
///
/// Returns the pixel dimensions of the written image.
pub fn render_band_to_png(
    band: ArrayView2<f32>,
    style: &StyleSpec,
    size: CanvasSize,
    path: &Path,
) -> Result<(u32, u32)> {
    let start = Instant::now();
    let (width, height) = size.resolve(band.ncols(), band.nrows())?;

    let mut canvas = Canvas::acquire(width, height);
    canvas.draw_band(band, style);
    canvas.save_png(path)?;

    info!(
        path = %path.display(),
        style = %style.name,
        width = width,
        height = height,
        duration_ms = start.elapsed().as_millis() as u64,
        "PNG rendered"
    );
    Ok((width, height))
}
