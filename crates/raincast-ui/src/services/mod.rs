pub mod forecast_service;
pub mod location_service;

pub use forecast_service::{request_forecast, ForecastFetchError};
pub use location_service::request_location;

use raincast_weather::{ForecastPoint, ResolvedLocation};

/// Messages sent from async operations back to the dashboard.
///
/// Every message carries the sequence number of the request that produced it.
#[derive(Debug)]
pub enum DashboardMessage {
    /// Result of a location refresh; always usable thanks to the default fallback
    LocationDone { seq: u64, result: ResolvedLocation },
    /// Result of a forecast fetch
    ForecastDone {
        seq: u64,
        result: Result<Vec<ForecastPoint>, ForecastFetchError>,
    },
}
