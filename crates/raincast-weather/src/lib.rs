//! Weather data for Raincast
//!
//! Resolves the device location (with Nominatim reverse geocoding and a fixed
//! fallback) and fetches rain probability forecasts from OpenWeatherMap.

pub mod types;
pub mod forecast;
pub mod geocode;
pub mod location;

pub use types::*;
pub use forecast::{filter_points, DayBoundary, ForecastClient, ForecastRecord, ForecastSettings};
pub use geocode::{GeocoderSettings, ReverseGeocoder};
pub use location::{
    ConfiguredPositionSource, FixedPositionSource, LocationResolution, LocationResolver,
    PositionSource, ResolvedLocation, ResolverSettings, SystemPositionSource,
};
