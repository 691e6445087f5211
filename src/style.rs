//! Variable-name driven display styles.
//!
//! Each raster variable produced by the pre-processing workflow has a
//! conventional look: categorical grids get a fixed palette with boundary
//! normalization, continuous grids get a named gradient. Lookup is by the
//! lower-cased variable name; anything unknown falls back to `Blues`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::colormaps::{
    parse_color, Binary, Blues, BrBG, Colormap, ListedColormap, Rgba, TRANSPARENT,
};

/// Continuous gradients available to styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradientKind {
    Blues,
    Binary,
    BrBG,
}

impl GradientKind {
    pub fn colormap(self) -> Box<dyn Colormap> {
        match self {
            GradientKind::Blues => Box::new(Blues),
            GradientKind::Binary => Box::new(Binary),
            GradientKind::BrBG => Box::new(BrBG),
        }
    }
}

/// How data values become colors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorMapping {
    /// A named continuous gradient, scaled between 0.1 and the band maximum
    Gradient { gradient: GradientKind },
    /// A fixed palette; `colors` holds one entry per normalization bin
    Discrete {
        palette: Vec<String>,
        colors: Vec<Rgba>,
    },
}

/// Boundary normalization partitioning values into color bins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub boundaries: Vec<f64>,
    /// Color for values at or above the last boundary
    pub over: Rgba,
}

/// Resolved display style for a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSpec {
    /// Table entry the variable matched, `default` when none did
    pub name: String,
    pub mapping: ColorMapping,
    pub normalization: Option<Normalization>,
}

impl StyleSpec {
    fn gradient(name: &str, gradient: GradientKind) -> Self {
        Self {
            name: name.to_string(),
            mapping: ColorMapping::Gradient { gradient },
            normalization: None,
        }
    }

    fn discrete(name: &str, palette: &[&str], boundaries: &[f64]) -> Self {
        let parsed: Vec<Rgba> = palette
            .iter()
            .map(|c| parse_color(c).unwrap_or(TRANSPARENT))
            .collect();
        match ListedColormap::from_palette(&parsed, boundaries.to_vec()) {
            Ok(listed) => Self {
                name: name.to_string(),
                mapping: ColorMapping::Discrete {
                    palette: palette.iter().map(|c| c.to_string()).collect(),
                    colors: listed.colors,
                },
                normalization: Some(Normalization {
                    boundaries: listed.norm.boundaries().to_vec(),
                    over: listed.over,
                }),
            },
            Err(e) => {
                debug!(style = name, error = %e, "Invalid style table entry, using default");
                Self::gradient(DEFAULT_STYLE, GradientKind::Blues)
            }
        }
    }

    /// Rebuild the listed colormap for a discrete style
    pub fn listed_colormap(&self) -> Option<ListedColormap> {
        match (&self.mapping, &self.normalization) {
            (ColorMapping::Discrete { colors, .. }, Some(norm)) => {
                let norm_edges = crate::colormaps::BoundaryNorm::new(norm.boundaries.clone()).ok()?;
                Some(ListedColormap {
                    norm: norm_edges,
                    colors: colors.clone(),
                    over: norm.over,
                })
            }
            _ => None,
        }
    }

    /// Whether the style is valid: bins and boundaries agree and edges increase
    pub fn is_valid(&self) -> bool {
        match (&self.mapping, &self.normalization) {
            (ColorMapping::Gradient { .. }, None) => true,
            (ColorMapping::Discrete { colors, .. }, Some(norm)) => {
                norm.boundaries.len() == colors.len() + 1
                    && norm.boundaries.windows(2).all(|w| w[0] < w[1])
            }
            _ => false,
        }
    }
}

const DEFAULT_STYLE: &str = "default";

const FLOW_DIRECTION_COLORS: [&str; 10] = [
    "#ff0000", "#5959a6", "#806c93", "#a65959", "#a68659", "#a6a659", "#93a659", "#669966",
    "#669988", "#999999",
];
const FLOW_DIRECTION_BOUNDS: [f64; 10] = [0.0, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0, 255.0];

const LANDUSE_COLORS: [&str; 20] = [
    "#ed0000", "#dbd83d", "#aa7028", "#fbf65d", "#e2e2c1", "#ccba7c", "#dcca8f", "#fde9aa",
    "#68aa63", "#85c724", "#38814e", "#1c6330", "#b5c98e", "#476ba0", "#70a3ba", "#bad8ea",
    "#b2ada3", "#c9c977", "#a58c30", "#d1ddf9",
];
const LANDUSE_BOUNDS: [f64; 21] = [
    1.0, 2.0, 3.0, 4.0, 5.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0,
    19.0, 20.0, 22.0, 23.0,
];

const STREAM_ORDER_COLORS: [&str; 5] = ["blue", "green", "red", "yellow", "#000000"];
const STREAM_ORDER_BOUNDS: [f64; 5] = [0.9, 1.9, 2.9, 3.9, 4.0];

static STYLE_TABLE: Lazy<HashMap<&'static str, StyleSpec>> = Lazy::new(|| {
    let mut table = HashMap::new();

    let binary = StyleSpec::gradient("binary", GradientKind::Binary);
    for key in ["latitude", "longitude", "channelgrid", "frxst_pts"] {
        table.insert(key, binary.clone());
    }

    let terrain = StyleSpec::gradient("BrBG", GradientKind::BrBG);
    for key in ["topography", "hgt_m"] {
        table.insert(key, terrain.clone());
    }

    table.insert(
        "flowdirection",
        StyleSpec::discrete("flowdirection", &FLOW_DIRECTION_COLORS, &FLOW_DIRECTION_BOUNDS),
    );
    table.insert(
        "landuse",
        StyleSpec::discrete("landuse", &LANDUSE_COLORS, &LANDUSE_BOUNDS),
    );
    table.insert(
        "streamorder",
        StyleSpec::discrete("streamorder", &STREAM_ORDER_COLORS, &STREAM_ORDER_BOUNDS),
    );

    table
});

/// Resolve the display style for a variable name (case-insensitive).
///
/// Never fails: unknown names get the `Blues` gradient with no normalization.
pub fn resolve_style(variable_name: &str) -> StyleSpec {
    let key = variable_name.to_lowercase();
    match STYLE_TABLE.get(key.as_str()) {
        Some(style) => style.clone(),
        None => StyleSpec::gradient(DEFAULT_STYLE, GradientKind::Blues),
    }
}

/// Variable names with a dedicated style, sorted
pub fn known_variables() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = STYLE_TABLE.keys().copied().collect();
    names.sort_unstable();
    names
}
