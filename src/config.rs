//! Runtime configuration.
//!
//! Static option tables live in [`crate::catalog`]; the values here are the
//! tunables a user can override from the command line.

use std::time::Duration;

use crate::catalog::{self, MapLayer};

/// USGS base URL for the summary GeoJSON feeds.
pub const USGS_FEED_BASE_URL: &str = "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary";

/// Default transport timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Feed client configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub base_url: String,
    /// `None` leaves the request without a client-side deadline.
    pub timeout: Option<Duration>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: USGS_FEED_BASE_URL.to_string(),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

/// Keeps the loading indicator up for large result sets so it does not
/// flash away the instant the data lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingHold {
    /// Result sets strictly larger than this are held.
    pub threshold: usize,
    /// Minimum time since the fetch started before the indicator hides.
    pub min_duration: Duration,
}

impl Default for LoadingHold {
    fn default() -> Self {
        Self {
            threshold: 5000,
            min_duration: Duration::from_secs(2),
        }
    }
}

/// Initial viewport and zoom limits for the map surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConfig {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: 20.0,
            center_lon: 0.0,
            zoom: 2.7,
            min_zoom: 2.7,
            max_zoom: 18.0,
        }
    }
}

/// Initial filter selection and loading behavior for the application shell.
#[derive(Debug, Clone, Copy)]
pub struct ShellConfig {
    pub layer: &'static MapLayer,
    pub time_range: &'static str,
    pub magnitude: &'static str,
    pub hold: LoadingHold,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            layer: catalog::default_layer(),
            time_range: catalog::DEFAULT_TIME_RANGE,
            magnitude: catalog::DEFAULT_MAGNITUDE,
            hold: LoadingHold::default(),
        }
    }
}
