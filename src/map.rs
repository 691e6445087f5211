//! Interactive map documents.
//!
//! A [`MapWidget`] is a serializable description of a Leaflet map: view,
//! layout, layers and controls. It can be persisted as JSON between runs and
//! exported as a standalone HTML page.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::MapConfig;
use crate::error::{OverlayError, Result};

/// Highest zoom level accepted by the map factory
pub const MAX_ZOOM: f64 = 24.0;

const LEAFLET_VERSION: &str = "1.9.4";
const FULLSCREEN_VERSION: &str = "3.0.2";

/// Corner of the map a control is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Position::TopLeft => "topleft",
            Position::TopRight => "topright",
            Position::BottomLeft => "bottomleft",
            Position::BottomRight => "bottomright",
        }
    }
}

/// Map controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Control {
    Scale { position: Position },
    FullScreen { position: Position },
    Layers { position: Position },
}

/// A geo-referenced image drawn over the base map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOverlay {
    pub id: Uuid,
    pub url: String,
    /// `[[south, west], [north, east]]`
    pub bounds: [[f64; 2]; 2],
    pub name: String,
}

impl ImageOverlay {
    pub fn new(url: impl Into<String>, bounds: [[f64; 2]; 2], name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            bounds,
            name: name.into(),
        }
    }
}

/// Map layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Layer {
    Tile {
        id: Uuid,
        name: String,
        url: String,
        attribution: String,
        base: bool,
    },
    ImageOverlay(ImageOverlay),
    GeoJson {
        id: Uuid,
        name: String,
        data: serde_json::Value,
    },
}

impl Layer {
    pub fn id(&self) -> Uuid {
        match self {
            Layer::Tile { id, .. } | Layer::GeoJson { id, .. } => *id,
            Layer::ImageOverlay(overlay) => overlay.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Layer::Tile { name, .. } | Layer::GeoJson { name, .. } => name,
            Layer::ImageOverlay(overlay) => &overlay.name,
        }
    }
}

/// Display size of the map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub width: String,
    pub height: String,
}

/// An interactive map description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapWidget {
    /// `[lat, lon]`
    pub center: [f64; 2],
    pub zoom: f64,
    pub scroll_wheel_zoom: bool,
    pub layout: Layout,
    pub layers: Vec<Layer>,
    pub controls: Vec<Control>,
}

/// Build the standard training map with default settings
pub fn create_map(center: (f64, f64), zoom: f64) -> Result<MapWidget> {
    create_map_with(center, zoom, &MapConfig::default())
}

/// Build a map with scroll zoom, scale, full-screen and layer controls
pub fn create_map_with(center: (f64, f64), zoom: f64, config: &MapConfig) -> Result<MapWidget> {
    let (lat, lon) = center;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(OverlayError::InvalidParameter {
            param: "center".to_string(),
            message: format!("({}, {}) is not a valid latitude/longitude", lat, lon),
        });
    }
    if !(0.0..=MAX_ZOOM).contains(&zoom) {
        return Err(OverlayError::InvalidParameter {
            param: "zoom".to_string(),
            message: format!("{} is outside 0..={}", zoom, MAX_ZOOM),
        });
    }

    let mut map = MapWidget {
        center: [lat, lon],
        zoom,
        scroll_wheel_zoom: true,
        layout: Layout {
            width: format!("{}px", config.width),
            height: format!("{}px", config.height),
        },
        layers: vec![Layer::Tile {
            id: Uuid::new_v4(),
            name: config.basemap_name.clone(),
            url: config.basemap_url.clone(),
            attribution: config.basemap_attribution.clone(),
            base: true,
        }],
        controls: Vec::new(),
    };
    map.add_control(Control::Scale {
        position: Position::BottomLeft,
    });
    map.add_control(Control::FullScreen {
        position: Position::TopLeft,
    });
    map.add_control(Control::Layers {
        position: Position::TopRight,
    });

    debug!(lat = lat, lon = lon, zoom = zoom, "Map created");
    Ok(map)
}

impl MapWidget {
    pub fn add_layer(&mut self, layer: Layer) {
        debug!(layer = layer.name(), id = %layer.id(), "Layer added");
        self.layers.push(layer);
    }

    pub fn add_control(&mut self, control: Control) {
        self.controls.push(control);
    }

    /// Add a GeoJSON outline layer, e.g. a boundary
    pub fn add_geojson_layer(&mut self, name: impl Into<String>, data: serde_json::Value) {
        self.add_layer(Layer::GeoJson {
            id: Uuid::new_v4(),
            name: name.into(),
            data,
        });
    }

    pub fn image_overlays(&self) -> impl Iterator<Item = &ImageOverlay> {
        self.layers.iter().filter_map(|layer| match layer {
            Layer::ImageOverlay(overlay) => Some(overlay),
            _ => None,
        })
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), layers = self.layers.len(), "Map saved");
        Ok(())
    }

    pub fn save_html(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_html()?)?;
        info!(path = %path.display(), "Map page exported");
        Ok(())
    }

    /// Render a standalone Leaflet page for this map
    pub fn to_html(&self) -> Result<String> {
        let mut script = String::new();
        script.push_str(&format!(
            "var map = L.map('map', {{center: {}, zoom: {}, scrollWheelZoom: {}}});\n",
            script_json(&self.center)?,
            self.zoom,
            self.scroll_wheel_zoom
        ));
        script.push_str("var baseLayers = {};\nvar overlays = {};\n");

        for layer in &self.layers {
            match layer {
                Layer::Tile {
                    name,
                    url,
                    attribution,
                    base,
                    ..
                } => {
                    let target = if *base { "baseLayers" } else { "overlays" };
                    script.push_str(&format!(
                        "{}[{}] = L.tileLayer({}, {{attribution: {}}}).addTo(map);\n",
                        target,
                        script_json(name)?,
                        script_json(url)?,
                        script_json(attribution)?
                    ));
                }
                Layer::ImageOverlay(overlay) => {
                    script.push_str(&format!(
                        "overlays[{}] = L.imageOverlay({}, {}).addTo(map);\n",
                        script_json(&overlay.name)?,
                        script_json(&overlay.url)?,
                        script_json(&overlay.bounds)?
                    ));
                }
                Layer::GeoJson { name, data, .. } => {
                    script.push_str(&format!(
                        "overlays[{}] = L.geoJSON({}, {{style: {{fill: false}}}}).addTo(map);\n",
                        script_json(name)?,
                        script_json(data)?
                    ));
                }
            }
        }

        for control in &self.controls {
            let line = match control {
                Control::Scale { position } => {
                    format!("L.control.scale({{position: '{}'}}).addTo(map);\n", position.as_str())
                }
                Control::FullScreen { position } => format!(
                    "L.control.fullscreen({{position: '{}'}}).addTo(map);\n",
                    position.as_str()
                ),
                Control::Layers { position } => format!(
                    "L.control.layers(baseLayers, overlays, {{position: '{}'}}).addTo(map);\n",
                    position.as_str()
                ),
            };
            script.push_str(&line);
        }

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<link rel="stylesheet" href="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.css">
<link rel="stylesheet" href="https://unpkg.com/leaflet.fullscreen@{fullscreen}/Control.FullScreen.css">
<script src="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.js"></script>
<script src="https://unpkg.com/leaflet.fullscreen@{fullscreen}/Control.FullScreen.js"></script>
</head>
<body>
<div id="map" style="width: {width}; height: {height};"></div>
<script>
{script}</script>
</body>
</html>
"#,
            leaflet = LEAFLET_VERSION,
            fullscreen = FULLSCREEN_VERSION,
            width = self.layout.width,
            height = self.layout.height,
            script = script
        ))
    }
}

/// JSON for embedding in a `<script>` block; `</` cannot close the element
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}
