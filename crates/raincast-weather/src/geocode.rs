//! Reverse geocoding: convert coordinates to human-readable place names.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.

use crate::types::Coordinate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("Raincast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    county: Option<String>,
}

impl NominatimAddress {
    /// First non-empty of city, town, county.
    fn place_name(self) -> Option<String> {
        [self.city, self.town, self.county]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct GeocoderSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            base_url: NOMINATIM_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Nominatim reverse geocoding client.
#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    client: Client,
    base_url: String,
}

impl ReverseGeocoder {
    pub fn new(settings: GeocoderSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Reverse geocode a coordinate to a place name (city, else town, else county).
    /// Returns `None` on any failure; the caller keeps its default name.
    #[instrument(skip(self), level = "debug")]
    pub async fn reverse_geocode(&self, coordinate: Coordinate) -> Option<String> {
        let url = format!("{}/reverse", self.base_url);
        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();

        let response = match self
            .client
            .get(&url)
            .query(&[("format", "json"), ("lat", lat.as_str()), ("lon", lon.as_str())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Reverse geocode request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return None;
        }

        let body: NominatimResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Reverse geocode parse error: {}", e);
                return None;
            }
        };

        let place = body.address?.place_name()?;
        tracing::info!("Reverse geocoded to: {}", place);
        Some(place)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn geocoder(server: &MockServer) -> ReverseGeocoder {
        ReverseGeocoder::new(GeocoderSettings {
            base_url: server.uri(),
            timeout: Duration::from_secs(2),
            user_agent: "raincast-test".to_string(),
        })
        .unwrap()
    }

    fn coordinate() -> Coordinate {
        Coordinate::new(23.8103, 90.4125).unwrap()
    }

    #[tokio::test]
    async fn test_reverse_geocode_prefers_city() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("format", "json"))
            .and(query_param("lat", "23.8103"))
            .and(query_param("lon", "90.4125"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "address": {"city": "Dhaka", "town": "Tejgaon", "county": "Dhaka District"}
            })))
            .mount(&server)
            .await;

        let name = geocoder(&server).reverse_geocode(coordinate()).await;
        assert_eq!(name.as_deref(), Some("Dhaka"));
    }

    #[tokio::test]
    async fn test_reverse_geocode_falls_back_to_town_then_county() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "address": {"town": "Savar", "county": "Dhaka District"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "address": {"county": "Dhaka District", "country": "Bangladesh"}
            })))
            .mount(&server)
            .await;

        let geocoder = geocoder(&server);
        assert_eq!(
            geocoder.reverse_geocode(coordinate()).await.as_deref(),
            Some("Savar")
        );
        assert_eq!(
            geocoder.reverse_geocode(coordinate()).await.as_deref(),
            Some("Dhaka District")
        );
    }

    #[tokio::test]
    async fn test_reverse_geocode_without_usable_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "address": {"state": "Dhaka Division", "country": "Bangladesh"}
            })))
            .mount(&server)
            .await;

        assert_eq!(geocoder(&server).reverse_geocode(coordinate()).await, None);
    }

    #[tokio::test]
    async fn test_reverse_geocode_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert_eq!(geocoder(&server).reverse_geocode(coordinate()).await, None);
    }

    #[tokio::test]
    async fn test_reverse_geocode_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        assert_eq!(geocoder(&server).reverse_geocode(coordinate()).await, None);
    }

    #[tokio::test]
    #[ignore] // Run with: cargo test -p raincast-weather -- --ignored
    async fn test_reverse_geocode_live_dhaka() {
        let geocoder = ReverseGeocoder::new(GeocoderSettings::default()).unwrap();
        let name = geocoder.reverse_geocode(coordinate()).await;
        assert!(name.is_some());
    }
}
