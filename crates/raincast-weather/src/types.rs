use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Display name used when reverse geocoding yields no place name.
pub const UNNAMED_LOCATION: &str = "Your Location";

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside lat [-90, 90] / lon [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A position fix reported by a [`crate::location::PositionSource`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub coordinate: Coordinate,
    pub accuracy_meters: Option<f64>,
}

/// Options for a one-shot position request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix that may be reused; zero means always take a fresh one.
    pub max_cached_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_cached_age: Duration::ZERO,
        }
    }
}

/// Resolved location: coordinate plus a human-readable name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coordinate: Coordinate,
    pub display_name: String,
    pub accuracy_meters: Option<f64>,
}

impl Location {
    pub fn new(coordinate: Coordinate, display_name: impl Into<String>) -> Self {
        Self {
            coordinate,
            display_name: display_name.into(),
            accuracy_meters: None,
        }
    }

    /// Location for a position whose place name could not be looked up.
    pub fn unnamed(position: Position) -> Self {
        Self {
            coordinate: position.coordinate,
            display_name: UNNAMED_LOCATION.to_string(),
            accuracy_meters: position.accuracy_meters,
        }
    }
}

/// Inclusive range of calendar days.
///
/// `start <= end` is the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Instants spanning `start 00:00:00.000` through `end 23:59:59.999` in `tz`.
    pub fn bounds_in<Tz: TimeZone>(&self, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = local_instant(tz, self.start, NaiveTime::MIN);
        let end = local_instant(tz, self.end, end_of_day());
        (start, end)
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

/// Convert a wall-clock time in `tz` to UTC.
///
/// Ambiguous times take the earlier instant. A time skipped by a DST jump
/// moves forward to the first wall-clock minute that exists.
fn local_instant<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(time);
    (0..=MAX_GAP_MINUTES)
        .filter_map(|minutes| naive.checked_add_signed(TimeDelta::minutes(minutes)))
        .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Longest wall-clock gap searched past a skipped time
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// One charted interval from the provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    /// Chance of rain in percent, 0-100
    pub rain_probability: f64,
}

/// Location service errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("Geolocation is not supported on this system")]
    Unsupported,
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location request cancelled")]
    Cancelled,
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
    #[error("Location error: {0}")]
    Other(String),
}

/// Forecast client errors. Every variant is a failed fetch from the caller's view.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Forecast provider returned HTTP {status}")]
    Status { status: u16, body: String },
    #[error("Forecast provider rejected the API key")]
    InvalidApiKey,
    #[error("No forecast API key configured")]
    MissingApiKey,
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Forecast request timed out")]
    Timeout,
    #[error("Forecast request cancelled")]
    Cancelled,
}
