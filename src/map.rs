//! Map surface: viewport, active layer and the memoized marker set.
//!
//! The viewport is an equirectangular window over the world. Each terminal
//! cell is treated as twice as tall as it is wide, so the latitude span is
//! derived from the longitude span and the area's shape.

use std::collections::HashSet;
use std::f64::consts::PI;
use std::sync::Arc;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::symbols;
use ratatui::widgets::Widget;
use ratatui::widgets::canvas::{Canvas, Map};
use tracing::debug;

use crate::catalog::MapLayer;
use crate::config::MapConfig;
use crate::marker::{MARKER_GLYPH, Marker};
use crate::models::Earthquake;

/// Full longitude range in degrees.
const WORLD_LON_SPAN: f64 = 360.0;

/// Web Mercator latitude limit used for tile addressing.
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Real-world extents the viewport may never leave.
pub const WORLD_BOUNDS: GeoBounds = GeoBounds {
    min_lat: -90.0,
    min_lon: -180.0,
    max_lat: 90.0,
    max_lon: 180.0,
};

/// Latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// Check if a point is within the bounds (edges included).
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    #[must_use]
    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    #[must_use]
    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }
}

/// Slippy-map tile containing a point at zoom `z`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn tile_for(lon: f64, lat: f64, z: u8) -> (u32, u32) {
    let n = f64::from(1u32 << z.min(31));
    let lat_rad = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();

    (x.clamp(0.0, n - 1.0) as u32, y.clamp(0.0, n - 1.0) as u32)
}

/// Visible map window and zoom level.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    /// Area size in terminal cells
    cols: u16,
    rows: u16,
}

impl Viewport {
    #[must_use]
    pub fn new(config: &MapConfig, cols: u16, rows: u16) -> Self {
        // Non-finite settings fall back to the defaults
        let defaults = MapConfig::default();
        let finite_or = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };

        let min_zoom = finite_or(config.min_zoom, defaults.min_zoom);
        let max_zoom = finite_or(config.max_zoom, defaults.max_zoom);
        let (min_zoom, max_zoom) = (min_zoom.min(max_zoom), max_zoom.max(min_zoom));
        let mut viewport = Self {
            center_lat: finite_or(config.center_lat, defaults.center_lat),
            center_lon: finite_or(config.center_lon, defaults.center_lon),
            zoom: finite_or(config.zoom, min_zoom).clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
            cols,
            rows,
        };
        viewport.clamp_center();
        viewport
    }

    /// Update the area size; keeps the window inside the world.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if (cols, rows) != (self.cols, self.rows) {
            self.cols = cols;
            self.rows = rows;
            self.clamp_center();
        }
    }

    /// Degrees of longitude across the area. Each zoom level halves it.
    #[must_use]
    pub fn lon_span(&self) -> f64 {
        WORLD_LON_SPAN / 2f64.powf(self.zoom - self.min_zoom)
    }

    /// Degrees of latitude across the area.
    #[must_use]
    pub fn lat_span(&self) -> f64 {
        if self.cols == 0 {
            return self.lon_span() / 2.0;
        }
        self.lon_span() * 2.0 * f64::from(self.rows) / f64::from(self.cols)
    }

    /// The geographic window currently shown.
    #[must_use]
    pub fn extent(&self) -> GeoBounds {
        let half_lon = self.lon_span() / 2.0;
        let half_lat = self.lat_span() / 2.0;
        GeoBounds {
            min_lat: self.center_lat - half_lat,
            min_lon: self.center_lon - half_lon,
            max_lat: self.center_lat + half_lat,
            max_lon: self.center_lon + half_lon,
        }
    }

    /// Pan by a number of cells. Stops hard at the world edge.
    pub fn pan(&mut self, d_cols: i32, d_rows: i32) {
        if self.cols == 0 || self.rows == 0 {
            return;
        }
        self.center_lon += f64::from(d_cols) * self.lon_span() / f64::from(self.cols);
        self.center_lat -= f64::from(d_rows) * self.lat_span() / f64::from(self.rows);
        self.clamp_center();
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + 1.0);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - 1.0);
    }

    /// Zoom by `delta` levels, keeping the point under a cell fixed.
    pub fn zoom_at(&mut self, col: u16, row: u16, delta: f64) {
        if self.cols == 0 || self.rows == 0 {
            self.set_zoom(self.zoom + delta);
            return;
        }
        let (lon, lat) = self.unproject(col, row);
        let fx = (f64::from(col) + 0.5) / f64::from(self.cols);
        let fy = (f64::from(row) + 0.5) / f64::from(self.rows);

        self.zoom = (self.zoom + delta).clamp(self.min_zoom, self.max_zoom);
        self.center_lon = lon - (fx - 0.5) * self.lon_span();
        self.center_lat = lat + (fy - 0.5) * self.lat_span();
        self.clamp_center();
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.clamp_center();
    }

    /// Keep the extent inside the world; an axis wider than the world is centered.
    fn clamp_center(&mut self) {
        fn clamp_axis(center: f64, half: f64, min: f64, max: f64) -> f64 {
            if half * 2.0 >= max - min {
                (min + max) / 2.0
            } else {
                center.clamp(min + half, max - half)
            }
        }

        let half_lon = self.lon_span() / 2.0;
        let half_lat = self.lat_span() / 2.0;
        self.center_lon = clamp_axis(
            self.center_lon,
            half_lon,
            WORLD_BOUNDS.min_lon,
            WORLD_BOUNDS.max_lon,
        );
        self.center_lat = clamp_axis(
            self.center_lat,
            half_lat,
            WORLD_BOUNDS.min_lat,
            WORLD_BOUNDS.max_lat,
        );
    }

    /// Cell (column, row) for a geographic point, if it is on screen.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn project(&self, lon: f64, lat: f64) -> Option<(u16, u16)> {
        if self.cols == 0 || self.rows == 0 {
            return None;
        }
        let extent = self.extent();
        if !extent.contains(lat, lon) {
            return None;
        }
        let col = ((lon - extent.min_lon) / extent.lon_span() * f64::from(self.cols)).floor();
        let row = ((extent.max_lat - lat) / extent.lat_span() * f64::from(self.rows)).floor();
        Some((
            (col as u16).min(self.cols - 1),
            (row as u16).min(self.rows - 1),
        ))
    }

    /// Geographic (lon, lat) at the center of a cell.
    #[must_use]
    pub fn unproject(&self, col: u16, row: u16) -> (f64, f64) {
        let extent = self.extent();
        let cols = f64::from(self.cols.max(1));
        let rows = f64::from(self.rows.max(1));
        let lon = extent.min_lon + (f64::from(col) + 0.5) / cols * extent.lon_span();
        let lat = extent.max_lat - (f64::from(row) + 0.5) / rows * extent.lat_span();
        (lon, lat)
    }

    /// Integer zoom used for tile addressing.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn tile_zoom(&self) -> u8 {
        self.zoom.floor().clamp(0.0, 30.0) as u8
    }
}

/// Owns the viewport, the active layer and the markers built from the
/// current earthquake list.
pub struct MapSurface {
    pub viewport: Viewport,
    layer: &'static MapLayer,
    /// List the markers were built from; compared by identity
    source: Option<Arc<Vec<Earthquake>>>,
    markers: Vec<Marker>,
    rebuilds: usize,
}

impl MapSurface {
    #[must_use]
    pub fn new(config: &MapConfig, layer: &'static MapLayer) -> Self {
        Self {
            viewport: Viewport::new(config, 0, 0),
            layer,
            source: None,
            markers: Vec::new(),
            rebuilds: 0,
        }
    }

    #[must_use]
    pub fn layer(&self) -> &'static MapLayer {
        self.layer
    }

    /// Swap the tile layer. Returns `false` when it is already active.
    pub fn set_layer(&mut self, layer: &'static MapLayer) -> bool {
        if self.layer.id == layer.id {
            return false;
        }
        debug!(from = self.layer.id, to = layer.id, "switching map layer");
        self.layer = layer;
        true
    }

    /// Rebuild markers if `quakes` is a different list than last time.
    ///
    /// Popups stay open for ids present in both lists.
    pub fn sync_markers(&mut self, quakes: &Arc<Vec<Earthquake>>) -> bool {
        if matches!(&self.source, Some(current) if Arc::ptr_eq(current, quakes)) {
            return false;
        }

        let open: HashSet<String> = self
            .markers
            .iter()
            .filter(|m| m.is_popup_open())
            .map(|m| m.id.clone())
            .collect();

        self.markers = quakes
            .iter()
            .map(|quake| {
                let mut marker = Marker::from_quake(quake);
                if open.contains(&quake.id) {
                    marker.set_popup_open(true);
                }
                marker
            })
            .collect();
        self.source = Some(Arc::clone(quakes));
        self.rebuilds += 1;

        debug!(markers = self.markers.len(), "rebuilt marker layer");
        true
    }

    #[must_use]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// How many times the marker set has been rebuilt.
    #[must_use]
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Index of the topmost marker drawn at a cell.
    #[must_use]
    pub fn marker_at(&self, col: u16, row: u16) -> Option<usize> {
        self.markers
            .iter()
            .rposition(|m| self.viewport.project(m.lon, m.lat) == Some((col, row)))
    }

    /// Toggle the popup of the marker at a cell. Returns `true` on a hit.
    pub fn toggle_popup_at(&mut self, col: u16, row: u16) -> bool {
        match self.marker_at(col, row) {
            Some(idx) => {
                self.markers[idx].toggle_popup();
                true
            }
            None => false,
        }
    }

    pub fn close_popups(&mut self) {
        for marker in &mut self.markers {
            marker.set_popup_open(false);
        }
    }

    /// Tile under the viewport center, expanded through the layer template.
    #[must_use]
    pub fn center_tile_url(&self) -> String {
        let z = self.viewport.tile_zoom();
        let (x, y) = tile_for(self.viewport.center_lon, self.viewport.center_lat, z);
        self.layer.tile_url(z, x, y)
    }
}

/// Draws the basemap and markers of a [`MapSurface`].
///
/// The surface's viewport must already be sized to the target area.
pub struct MapView<'a> {
    surface: &'a MapSurface,
}

impl<'a> MapView<'a> {
    #[must_use]
    pub fn new(surface: &'a MapSurface) -> Self {
        Self { surface }
    }
}

impl Widget for MapView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let viewport = &self.surface.viewport;
        let theme = self.surface.layer.theme;
        let extent = viewport.extent();

        Canvas::default()
            .background_color(theme.background)
            .marker(symbols::Marker::Braille)
            .x_bounds([extent.min_lon, extent.max_lon])
            .y_bounds([extent.min_lat, extent.max_lat])
            .paint(|ctx| {
                ctx.draw(&Map {
                    color: theme.land,
                    resolution: theme.resolution,
                });
            })
            .render(area, buf);

        for marker in &self.surface.markers {
            let Some((col, row)) = viewport.project(marker.lon, marker.lat) else {
                continue;
            };
            if col >= area.width || row >= area.height {
                continue;
            }
            buf[(area.x + col, area.y + row)]
                .set_char(MARKER_GLYPH)
                .set_style(marker.style());
        }
    }
}
