//! Static option tables: map layers, filter options and the magnitude legend.
//!
//! Option ids double as feed URL segments, so they must match the names the
//! USGS summary feed publishes (`{magnitude}_{time_range}.geojson`).

use ratatui::style::Color;
use ratatui::widgets::canvas::MapResolution;

use crate::marker::MagnitudeBucket;

/// Default time range id.
pub const DEFAULT_TIME_RANGE: &str = "day";

/// Default magnitude threshold id.
pub const DEFAULT_MAGNITUDE: &str = "all";

/// How a layer is drawn in the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerTheme {
    /// Coastline color
    pub land: Color,
    /// Canvas background
    pub background: Color,
    /// Overlay text (title, status line)
    pub text: Color,
    pub resolution: MapResolution,
}

/// A tile source definition for the map background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapLayer {
    pub id: &'static str,
    pub name: &'static str,
    /// Tile template with `{s}`, `{z}`, `{x}`, `{y}` and optional `{r}`
    pub url: &'static str,
    pub attribution: &'static str,
    pub theme: LayerTheme,
}

impl MapLayer {
    /// Expand the tile template for one tile.
    ///
    /// The subdomain placeholder resolves to `a` and the retina suffix to
    /// nothing.
    #[must_use]
    pub fn tile_url(&self, z: u8, x: u32, y: u32) -> String {
        self.url
            .replace("{s}", "a")
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
            .replace("{r}", "")
    }
}

/// All map layers; the first one is the default.
pub const MAP_LAYERS: &[MapLayer] = &[
    MapLayer {
        id: "openstreetmap",
        name: "Street Map",
        url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
        attribution: "© OpenStreetMap contributors",
        theme: LayerTheme {
            land: Color::Rgb(90, 90, 90),
            background: Color::Rgb(242, 239, 233),
            text: Color::Rgb(55, 65, 81),
            resolution: MapResolution::High,
        },
    },
    MapLayer {
        id: "satellite",
        name: "Satellite Map",
        url: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
        attribution: "© Esri, Maxar, Earthstar Geographics",
        theme: LayerTheme {
            land: Color::Rgb(120, 150, 90),
            background: Color::Rgb(10, 30, 60),
            text: Color::White,
            resolution: MapResolution::High,
        },
    },
    MapLayer {
        id: "terrain",
        name: "Terrain Map",
        url: "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
        attribution: "© OpenTopoMap contributors",
        theme: LayerTheme {
            land: Color::Rgb(140, 110, 70),
            background: Color::Rgb(170, 210, 225),
            text: Color::Rgb(55, 65, 81),
            resolution: MapResolution::Low,
        },
    },
    MapLayer {
        id: "dark",
        name: "Dark Map",
        url: "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
        attribution: "© OpenStreetMap contributors © CARTO",
        theme: LayerTheme {
            land: Color::DarkGray,
            background: Color::Black,
            text: Color::White,
            resolution: MapResolution::High,
        },
    },
];

/// A selectable filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOption {
    /// Feed URL segment and selection key
    pub id: &'static str,
    pub name: &'static str,
}

pub const TIME_RANGE_OPTIONS: &[FilterOption] = &[
    FilterOption { id: "day", name: "Last 24 hours" },
    FilterOption { id: "hour", name: "Last 1 hour" },
    FilterOption { id: "week", name: "Last 7 days" },
    FilterOption { id: "month", name: "Last 30 days" },
];

pub const MAGNITUDE_OPTIONS: &[FilterOption] = &[
    FilterOption { id: "all", name: "0.0 & above" },
    FilterOption { id: "1.0", name: "1.0 & above" },
    FilterOption { id: "2.5", name: "2.5 & above" },
    FilterOption { id: "4.5", name: "4.5 & above" },
];

/// One row of the marker color legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegendEntry {
    pub name: &'static str,
    pub bucket: MagnitudeBucket,
}

impl LegendEntry {
    #[must_use]
    pub fn color(&self) -> Color {
        self.bucket.color()
    }
}

pub const MAGNITUDE_LEGEND: &[LegendEntry] = &[
    LegendEntry { name: "0.0 - 2.9", bucket: MagnitudeBucket::Minor },
    LegendEntry { name: "3.0 - 4.9", bucket: MagnitudeBucket::Light },
    LegendEntry { name: "5.0 - 6.9", bucket: MagnitudeBucket::Moderate },
    LegendEntry { name: "7.0 & above", bucket: MagnitudeBucket::Major },
];

/// The layer shown at startup.
#[must_use]
pub fn default_layer() -> &'static MapLayer {
    &MAP_LAYERS[0]
}

#[must_use]
pub fn find_layer(id: &str) -> Option<&'static MapLayer> {
    MAP_LAYERS.iter().find(|l| l.id == id)
}

#[must_use]
pub fn find_time_range(id: &str) -> Option<&'static FilterOption> {
    TIME_RANGE_OPTIONS.iter().find(|o| o.id == id)
}

#[must_use]
pub fn find_magnitude(id: &str) -> Option<&'static FilterOption> {
    MAGNITUDE_OPTIONS.iter().find(|o| o.id == id)
}

/// Display name for a time range id, falling back to the id itself.
#[must_use]
pub fn time_range_name(id: &str) -> &str {
    find_time_range(id).map_or(id, |o| o.name)
}

/// Display name for a magnitude id, falling back to the id itself.
#[must_use]
pub fn magnitude_name(id: &str) -> &str {
    find_magnitude(id).map_or(id, |o| o.name)
}
