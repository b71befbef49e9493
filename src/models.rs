//! Data models for the USGS summary feed and the point records built from it.
//!
//! The raw structures mirror the GeoJSON served by the feed; only the fields
//! the map needs are decoded; everything else in the payload is ignored.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::errors::GeoquakeError;

/// Top-level GeoJSON response from the summary feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    /// Always "FeatureCollection"
    #[serde(rename = "type")]
    pub type_: String,

    /// Feed metadata, absent on some mirrors
    #[serde(default)]
    pub metadata: Option<Metadata>,

    /// Earthquake events
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Validate the response structure.
    pub fn validate(&self) -> Result<(), GeoquakeError> {
        if self.type_ != "FeatureCollection" {
            return Err(GeoquakeError::InvalidResponse(format!(
                "expected type 'FeatureCollection', got '{}'",
                self.type_
            )));
        }
        Ok(())
    }

    /// Convert every feature into a point record.
    ///
    /// Fails on the first invalid feature; no partial list is returned.
    pub fn into_points(self) -> Result<Vec<Earthquake>, GeoquakeError> {
        self.validate()?;
        self.features.into_iter().map(Earthquake::try_from).collect()
    }
}

/// Metadata about the feed response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Human-readable title
    pub title: String,

    /// Number of events in response
    pub count: usize,
}

/// A single earthquake event as served by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    /// Unique event ID
    pub id: String,

    /// Geographic location
    pub geometry: Geometry,

    /// Event properties
    pub properties: Properties,
}

impl Feature {
    /// Validate the event structure.
    pub fn validate(&self) -> Result<(), GeoquakeError> {
        if self.id.is_empty() {
            return Err(GeoquakeError::Validation("empty event ID".into()));
        }
        if self.geometry.lon_lat().is_none() {
            return Err(missing_position(&self.id));
        }
        Ok(())
    }
}

fn missing_position(id: &str) -> GeoquakeError {
    GeoquakeError::Validation(format!("event {id}: missing longitude or latitude"))
}

/// Geographic geometry for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    /// Coordinates: [longitude, latitude, depth_km]; entries may be null
    pub coordinates: Vec<Option<f64>>,
}

impl Geometry {
    /// Longitude and latitude, when both are present.
    #[must_use]
    pub fn lon_lat(&self) -> Option<(f64, f64)> {
        match self.coordinates.as_slice() {
            [Some(lon), Some(lat), ..] => Some((*lon, *lat)),
            _ => None,
        }
    }

    /// Depth in km, NaN when null or missing. Extra entries are ignored.
    #[must_use]
    pub fn depth_km(&self) -> f64 {
        self.coordinates.get(2).copied().flatten().unwrap_or(f64::NAN)
    }
}

/// Event properties used by the map.
#[derive(Debug, Clone, Deserialize)]
pub struct Properties {
    /// Magnitude value
    pub mag: Option<f64>,

    /// Human-readable place description
    pub place: Option<String>,

    /// Event time (ms since epoch)
    pub time: i64,
}

/// One earthquake, normalized for display.
///
/// `position` is `[latitude, longitude, depth_km]`, the order map
/// coordinates are usually written in.
#[derive(Debug, Clone, PartialEq)]
pub struct Earthquake {
    pub id: String,
    pub magnitude: Option<f64>,
    pub place: Option<String>,
    pub time: i64,
    pub position: [f64; 3],
}

impl Earthquake {
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.position[0]
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.position[1]
    }

    /// Depth in kilometers (positive down); NaN when the feed has none.
    #[must_use]
    pub fn depth_km(&self) -> f64 {
        self.position[2]
    }

    /// Get the event time as a `DateTime<Utc>`.
    #[must_use]
    pub fn time_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.time).single()
    }
}

impl TryFrom<Feature> for Earthquake {
    type Error = GeoquakeError;

    fn try_from(feature: Feature) -> Result<Self, Self::Error> {
        feature.validate()?;

        // Feed order is [lon, lat, depth]
        let (lon, lat) = feature
            .geometry
            .lon_lat()
            .ok_or_else(|| missing_position(&feature.id))?;
        let depth = feature.geometry.depth_km();

        Ok(Self {
            id: feature.id,
            magnitude: feature.properties.mag,
            place: feature.properties.place,
            time: feature.properties.time,
            position: [lat, lon, depth],
        })
    }
}
