//! USGS summary feed client.
//!
//! Provides async HTTP access to the summary GeoJSON feeds and converts the
//! response into point records. Uses reqwest with rustls for TLS.

use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::FeedConfig;
use crate::errors::GeoquakeError;
use crate::models::{Earthquake, FeatureCollection};

/// User agent string for feed requests.
const USER_AGENT: &str = concat!("geoquake/", env!("CARGO_PKG_VERSION"));

/// Build the feed URL for a magnitude and time range id.
///
/// The ids are interpolated as-is.
#[must_use]
pub fn feed_url(base_url: &str, magnitude: &str, time_range: &str) -> String {
    format!(
        "{}/{magnitude}_{time_range}.geojson",
        base_url.trim_end_matches('/')
    )
}

/// Decode a feed body into point records.
///
/// # Errors
///
/// Returns an error if the body is not a valid feature collection.
pub fn parse_points(body: &[u8]) -> Result<Vec<Earthquake>, GeoquakeError> {
    let feed: FeatureCollection = serde_json::from_slice(body)?;

    if let Some(meta) = &feed.metadata {
        if meta.count != feed.features.len() {
            debug!(
                "{}: metadata count {} differs from {} features",
                meta.title,
                meta.count,
                feed.features.len()
            );
        }
    }

    feed.into_points()
}

/// Client for the earthquake summary feed.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    base_url: String,
}

impl FeedClient {
    /// Create a new feed client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &FeedConfig) -> Result<Self, GeoquakeError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
        })
    }

    /// URL requested for a magnitude and time range.
    #[must_use]
    pub fn url_for(&self, magnitude: &str, time_range: &str) -> String {
        feed_url(&self.base_url, magnitude, time_range)
    }

    /// Fetch the feed for a magnitude threshold and time range.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the feed answers with a
    /// non-success status, or the body cannot be decoded.
    #[instrument(skip(self))]
    pub async fn fetch_points(
        &self,
        magnitude: &str,
        time_range: &str,
    ) -> Result<Vec<Earthquake>, GeoquakeError> {
        let url = self.url_for(magnitude, time_range);

        debug!("fetching feed from {}", url);

        let response = self.client.get(&url).send().await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            return Err(GeoquakeError::Api {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let points = parse_points(&body)?;

        debug!("fetched {} events", points.len());
        Ok(points)
    }
}
