//! OpenWeatherMap 5 day / 3 hour forecast client.
//!
//! The provider always returns its full horizon; the requested date range is
//! applied client-side.
//! See: https://openweathermap.org/forecast5

use chrono::{DateTime, Local, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::types::{Coordinate, DateRange, ForecastError, ForecastPoint};

pub const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Timezone in which the selected calendar days start and end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayBoundary {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone)]
pub struct ForecastSettings {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub day_boundary: DayBoundary,
}

impl ForecastSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENWEATHER_URL.to_string(),
            timeout: Duration::from_secs(10),
            day_boundary: DayBoundary::default(),
        }
    }
}

// --- OpenWeatherMap JSON response types ---

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastRecord>,
}

/// One provider interval: `dt` in epoch seconds, `pop` as a 0-1 fraction.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ForecastRecord {
    pub dt: i64,
    pub pop: f64,
}

impl ForecastRecord {
    fn to_point(self) -> Option<ForecastPoint> {
        let timestamp = DateTime::<Utc>::from_timestamp(self.dt, 0)?;
        Some(ForecastPoint {
            timestamp,
            rain_probability: self.pop * 100.0,
        })
    }
}

/// Map provider records to points and keep those within `[start, end]`.
///
/// Provider order is preserved.
pub fn filter_points(
    records: &[ForecastRecord],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<ForecastPoint> {
    records
        .iter()
        .filter_map(|record| record.to_point())
        .filter(|point| point.timestamp >= start && point.timestamp <= end)
        .collect()
}

/// Client for the OpenWeatherMap forecast endpoint.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: Client,
    api_key: String,
    base_url: String,
    day_boundary: DayBoundary,
}

impl ForecastClient {
    pub fn new(settings: ForecastSettings) -> Result<Self, ForecastError> {
        let api_key = settings.api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(ForecastError::MissingApiKey);
        }

        let client = Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            day_boundary: settings.day_boundary,
        })
    }

    /// Inclusive instants for the range under this client's day boundary.
    pub fn bounds(&self, range: &DateRange) -> (DateTime<Utc>, DateTime<Utc>) {
        match self.day_boundary {
            DayBoundary::Local => range.bounds_in(&Local),
            DayBoundary::Utc => range.bounds_in(&Utc),
        }
    }

    /// Fetch the rain probability series for `range` at `coordinate`.
    ///
    /// A range outside the provider's horizon yields an empty series.
    #[instrument(skip(self, cancel), level = "info")]
    pub async fn get_forecast(
        &self,
        coordinate: Coordinate,
        range: &DateRange,
        cancel: &CancellationToken,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        let records = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ForecastError::Cancelled),
            records = self.fetch_records(coordinate) => records?,
        };

        let (start, end) = self.bounds(range);
        let points = filter_points(&records, start, end);
        tracing::debug!(
            received = records.len(),
            kept = points.len(),
            "Filtered forecast records"
        );
        Ok(points)
    }

    async fn fetch_records(
        &self,
        coordinate: Coordinate,
    ) -> Result<Vec<ForecastRecord>, ForecastError> {
        let url = format!("{}/forecast", self.base_url);
        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ForecastError::Timeout
                } else {
                    ForecastError::Network(e)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ForecastError::InvalidApiKey);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Forecast request failed");
            return Err(ForecastError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let body: ForecastResponse =
            serde_json::from_str(&text).map_err(|e| ForecastError::Parse(e.to_string()))?;
        Ok(body.list)
    }
}
