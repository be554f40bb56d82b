//! Dashboard state: the resolved location, the charted forecast and the
//! loading/error flags that decide what the chart area shows.
//!
//! Every location refresh and forecast fetch is tagged with a sequence
//! number. Only the response to the most recent request is applied, so a slow
//! response for an old date range can never overwrite a newer one.

use chrono::{DateTime, Local};
use raincast_core::AppError;
use raincast_weather::{Coordinate, DateRange, ForecastPoint, Location, ResolvedLocation};
use tokio_util::sync::CancellationToken;

use crate::services::{DashboardMessage, ForecastFetchError};

pub const DETECTING_LOCATION: &str = "Detecting your location...";
pub const LOADING_WEATHER: &str = "Loading weather data...";
pub const NO_DATA: &str = "No data available for the selected range";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingState {
    pub location: bool,
    pub weather: bool,
}

impl LoadingState {
    pub fn any(&self) -> bool {
        self.location || self.weather
    }
}

/// Handle for an in-flight location refresh
#[derive(Debug, Clone)]
pub struct LocationTicket {
    pub seq: u64,
    pub cancel: CancellationToken,
}

/// Everything a forecast fetch needs, captured when the request is issued
#[derive(Debug, Clone)]
pub struct ForecastTicket {
    pub seq: u64,
    pub coordinate: Coordinate,
    pub range: DateRange,
    pub cancel: CancellationToken,
}

/// What the chart area currently shows, in priority order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartArea<'a> {
    DetectingLocation,
    LoadingWeather,
    Error(&'a str),
    NoData,
    Chart(&'a [ForecastPoint]),
}

impl<'a> ChartArea<'a> {
    /// Placeholder text for every state except a drawn chart.
    pub fn message(&self) -> Option<&'a str> {
        match self {
            ChartArea::DetectingLocation => Some(DETECTING_LOCATION),
            ChartArea::LoadingWeather => Some(LOADING_WEATHER),
            ChartArea::Error(text) => Some(*text),
            ChartArea::NoData => Some(NO_DATA),
            ChartArea::Chart(_) => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DashboardModel {
    location: Option<Location>,
    notice: Option<String>,
    rain_data: Vec<ForecastPoint>,
    loading: LoadingState,
    error: Option<String>,
    selected_range: Option<DateRange>,
    last_updated: Option<DateTime<Local>>,
    location_seq: u64,
    forecast_seq: u64,
    location_cancel: Option<CancellationToken>,
    forecast_cancel: Option<CancellationToken>,
}

impl DashboardModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Non-blocking banner, set when the default location stands in.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn rain_data(&self) -> &[ForecastPoint] {
        &self.rain_data
    }

    pub fn loading(&self) -> LoadingState {
        self.loading
    }

    pub fn selected_range(&self) -> Option<DateRange> {
        self.selected_range
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    /// Start a location refresh.
    ///
    /// Clears the charted data and invalidates any forecast still in flight,
    /// since it was requested for the previous location.
    pub fn begin_location_refresh(&mut self) -> LocationTicket {
        self.location_seq += 1;
        let cancel = replace_token(&mut self.location_cancel);
        self.invalidate_forecast();

        self.rain_data.clear();
        self.error = None;
        self.notice = None;
        self.loading.location = true;

        LocationTicket {
            seq: self.location_seq,
            cancel,
        }
    }

    /// Store a resolved location. Returns false for a stale response.
    pub fn apply_location(&mut self, seq: u64, resolved: ResolvedLocation) -> bool {
        if seq != self.location_seq {
            tracing::debug!(seq, latest = self.location_seq, "Discarding stale location");
            return false;
        }

        self.location = Some(resolved.location);
        self.notice = resolved.notice;
        self.loading.location = false;
        self.location_cancel = None;
        true
    }

    /// Start a forecast fetch for `range` at the current location.
    ///
    /// Returns `None` while no location is known. The previous fetch, if any,
    /// is cancelled.
    pub fn begin_forecast(&mut self, range: DateRange) -> Option<ForecastTicket> {
        let coordinate = self.location.as_ref()?.coordinate;

        self.forecast_seq += 1;
        let cancel = replace_token(&mut self.forecast_cancel);
        self.selected_range = Some(range);
        self.loading.weather = true;
        self.error = None;

        Some(ForecastTicket {
            seq: self.forecast_seq,
            coordinate,
            range,
            cancel,
        })
    }

    /// Apply a forecast result. Returns false for a stale response.
    pub fn apply_forecast(
        &mut self,
        seq: u64,
        result: Result<Vec<ForecastPoint>, ForecastFetchError>,
    ) -> bool {
        if seq != self.forecast_seq {
            tracing::debug!(seq, latest = self.forecast_seq, "Discarding stale forecast");
            return false;
        }

        match result {
            Ok(points) => {
                tracing::info!("Loaded {} forecast points", points.len());
                self.rain_data = points;
                self.last_updated = Some(Local::now());
            }
            Err(e) => {
                tracing::error!("Error fetching weather data: {}", e);
                self.error = Some(AppError::from(e).user_message().to_string());
            }
        }
        self.loading.weather = false;
        self.forecast_cancel = None;
        true
    }

    /// Route a service message to the matching apply method.
    pub fn apply(&mut self, message: DashboardMessage) -> bool {
        match message {
            DashboardMessage::LocationDone { seq, result } => self.apply_location(seq, result),
            DashboardMessage::ForecastDone { seq, result } => self.apply_forecast(seq, result),
        }
    }

    pub fn view(&self) -> ChartArea<'_> {
        if self.loading.location {
            ChartArea::DetectingLocation
        } else if self.loading.weather {
            ChartArea::LoadingWeather
        } else if let Some(error) = &self.error {
            ChartArea::Error(error)
        } else if self.rain_data.is_empty() {
            ChartArea::NoData
        } else {
            ChartArea::Chart(&self.rain_data)
        }
    }

    /// Data-point count badge, shown only when there is data.
    pub fn badge(&self) -> Option<String> {
        if self.rain_data.is_empty() {
            None
        } else {
            Some(format!("{} data points", self.rain_data.len()))
        }
    }

    fn invalidate_forecast(&mut self) {
        self.forecast_seq += 1;
        if let Some(token) = self.forecast_cancel.take() {
            token.cancel();
        }
        self.loading.weather = false;
    }
}

/// Cancel the token in `slot` and install a fresh one.
fn replace_token(slot: &mut Option<CancellationToken>) -> CancellationToken {
    let token = CancellationToken::new();
    if let Some(previous) = slot.replace(token.clone()) {
        previous.cancel();
    }
    token
}
