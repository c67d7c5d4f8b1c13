//! Best-effort lookup of free-text place names.
//!
//! A failed lookup is never an error: every problem degrades to `None` and is logged.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GeocoderSettings;
use crate::domain::Coordinates;

/// Resolves a location string to coordinates.
#[allow(async_fn_in_trait)]
pub trait Geocoder {
    /// Single attempt; `None` covers "no such place" as well as network trouble.
    async fn resolve(&self, location: &str) -> Option<Coordinates>;
}

/// Geocoder used when lookups are turned off in configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGeocoder;

impl Geocoder for DisabledGeocoder {
    async fn resolve(&self, location: &str) -> Option<Coordinates> {
        debug!(location, "geocoding disabled");
        None
    }
}

/// One hit of a Nominatim-style search response. Coordinates come back as strings.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Parse a `format=json` search response body into the first hit's coordinates.
fn parse_search_response(body: &str) -> Option<Coordinates> {
    let hits: Vec<SearchHit> = serde_json::from_str(body).ok()?;
    let hit = hits.into_iter().next()?;
    let latitude = hit.lat.trim().parse().ok()?;
    let longitude = hit.lon.trim().parse().ok()?;
    Coordinates::new(latitude, longitude)
}

/// Geocoder calling a Nominatim-compatible `/search` endpoint over HTTP.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new(settings: &GeocoderSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build geocoding HTTP client")?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
        })
    }

    async fn lookup(&self, location: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", location), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .context("request failed")?
            .error_for_status()
            .context("provider returned an error status")?;

        response.text().await.context("failed to read response body")
    }
}

impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, location: &str) -> Option<Coordinates> {
        let location = location.trim();
        if location.is_empty() {
            return None;
        }

        match self.lookup(location).await {
            Ok(body) => {
                let coordinates = parse_search_response(&body);
                if coordinates.is_none() {
                    debug!(location, "no geocoding result");
                }
                coordinates
            }
            Err(e) => {
                warn!(location, error = %format!("{:#}", e), "geocoding lookup failed");
                None
            }
        }
    }
}

/// Geocoder selected at runtime from configuration.
pub enum GeocoderBackend {
    Nominatim(NominatimGeocoder),
    Disabled(DisabledGeocoder),
}

impl GeocoderBackend {
    pub fn from_settings(settings: &GeocoderSettings) -> Result<Self> {
        if settings.enabled {
            Ok(GeocoderBackend::Nominatim(NominatimGeocoder::new(settings)?))
        } else {
            Ok(GeocoderBackend::Disabled(DisabledGeocoder))
        }
    }
}

impl Geocoder for GeocoderBackend {
    async fn resolve(&self, location: &str) -> Option<Coordinates> {
        match self {
            GeocoderBackend::Nominatim(geocoder) => geocoder.resolve(location).await,
            GeocoderBackend::Disabled(geocoder) => geocoder.resolve(location).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_hit() {
        let body = r#"[{"place_id":1,"lat":"19.0760","lon":"72.8777","display_name":"Mumbai"},
                       {"place_id":2,"lat":"0","lon":"0"}]"#;
        assert_eq!(parse_search_response(body), Coordinates::new(19.076, 72.8777));
    }

    #[test]
    fn test_parse_empty_or_garbled() {
        assert_eq!(parse_search_response("[]"), None);
        assert_eq!(parse_search_response("not json"), None);
        assert_eq!(parse_search_response(r#"[{"lat":"north","lon":"1"}]"#), None);
        assert_eq!(parse_search_response(r#"[{"lat":"95","lon":"1"}]"#), None);
        assert_eq!(parse_search_response(r#"{"error":"rate limited"}"#), None);
    }

    #[tokio::test]
    async fn test_unreachable_provider_degrades_to_none() {
        let settings = GeocoderSettings {
            enabled: true,
            // Port 9 (discard) on loopback refuses connections
            endpoint: "http://127.0.0.1:9/search".to_string(),
            user_agent: "wanderlog-tests".to_string(),
            timeout_secs: 2,
        };
        let geocoder = GeocoderBackend::from_settings(&settings).unwrap();
        assert_eq!(geocoder.resolve("Nonexistentplace12345").await, None);
    }

    #[test]
    fn test_invalid_user_agent_fails_setup() {
        let settings = GeocoderSettings {
            user_agent: "wanderlog\nbroken".to_string(),
            ..GeocoderSettings::default()
        };
        let err = GeocoderBackend::from_settings(&settings).err().unwrap();
        assert!(format!("{:#}", err).contains("geocoding HTTP client"));
    }

    #[tokio::test]
    async fn test_disabled_geocoder() {
        let settings = GeocoderSettings {
            enabled: false,
            ..GeocoderSettings::default()
        };
        let geocoder = GeocoderBackend::from_settings(&settings).unwrap();
        assert!(matches!(geocoder, GeocoderBackend::Disabled(_)));
        assert_eq!(geocoder.resolve("Paris").await, None);
    }
}
