//! Centralized application services.
//!
//! `AppServices` owns the tokio runtime, the clients built from the
//! configuration and the channel the services report back on. The dashboard
//! model stays on the caller's thread and is only touched through `drain` or
//! `wait_idle`.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use raincast_core::{
    AppError, Config, ConfigError, DayBoundaries, LocationSourceKind, ReqwestErrorExt, API_KEY_ENV,
};
use raincast_weather::{
    ConfiguredPositionSource, Coordinate, DateRange, DayBoundary, FixedPositionSource,
    ForecastClient, ForecastSettings, GeocoderSettings, Location, LocationResolver,
    PositionOptions, ResolverSettings, ReverseGeocoder, SystemPositionSource,
};

use crate::models::DashboardModel;
use crate::services::{self, DashboardMessage, ForecastFetchError};

/// Desktop id reported to the platform location service
const DESKTOP_ID: &str = "raincast";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub type Resolver = LocationResolver<ConfiguredPositionSource>;

pub struct AppServices {
    /// Tokio runtime for async operations
    runtime: tokio::runtime::Runtime,

    resolver: Arc<Resolver>,
    forecast: Arc<ForecastClient>,

    /// Dashboard service channel
    tx: Sender<DashboardMessage>,
    rx: Receiver<DashboardMessage>,
}

impl AppServices {
    /// Build every client from `config`.
    ///
    /// Fails when the forecast API key is missing or a configured coordinate
    /// is out of range.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("raincast-worker")
            .enable_all()
            .build()?;

        let forecast =
            ForecastClient::new(forecast_settings(config)?).map_err(ForecastFetchError::from)?;
        let geocoder = ReverseGeocoder::new(geocoder_settings(config))
            .map_err(|e| AppError::Network(e.into_network_error()))?;
        let resolver = LocationResolver::new(
            position_source(config)?,
            geocoder,
            resolver_settings(config)?,
        );

        let (tx, rx) = mpsc::channel();
        tracing::info!(source = ?config.location.source, "Services initialized");

        Ok(Self {
            runtime,
            resolver: Arc::new(resolver),
            forecast: Arc::new(forecast),
            tx,
            rx,
        })
    }

    pub fn refresh_location(&self, model: &mut DashboardModel) {
        let ticket = model.begin_location_refresh();
        services::request_location(self.runtime.handle(), &self.tx, self.resolver.clone(), ticket);
    }

    /// Request the forecast for `range`. Returns false while no location is known.
    pub fn fetch_forecast(&self, model: &mut DashboardModel, range: DateRange) -> bool {
        match model.begin_forecast(range) {
            Some(ticket) => {
                services::request_forecast(
                    self.runtime.handle(),
                    &self.tx,
                    self.forecast.clone(),
                    ticket,
                );
                true
            }
            None => false,
        }
    }

    /// Apply every message that has already arrived. Returns how many were applied.
    pub fn drain(&self, model: &mut DashboardModel) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.rx.try_recv() {
            if model.apply(message) {
                applied += 1;
            }
        }
        applied
    }

    /// Apply messages until nothing is loading, or `timeout` passes.
    ///
    /// Returns true when the model went idle.
    pub fn wait_idle(&self, model: &mut DashboardModel, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while model.loading().any() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!("Timed out waiting for dashboard services");
                return false;
            }
            match self.rx.recv_timeout(remaining.min(POLL_INTERVAL)) {
                Ok(message) => {
                    model.apply(message);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    /// Stop the runtime, dropping any request still in flight.
    pub fn shutdown(self) {
        tracing::info!("Shutting down services");
        self.runtime.shutdown_timeout(Duration::from_secs(1));
    }
}

pub fn forecast_settings(config: &Config) -> Result<ForecastSettings, AppError> {
    let api_key = config
        .forecast
        .api_key()
        .ok_or_else(|| ConfigError::MissingSetting(API_KEY_ENV.to_string()))?;

    Ok(ForecastSettings {
        api_key: api_key.to_string(),
        base_url: config.forecast.base_url.clone(),
        timeout: Duration::from_secs(config.forecast.timeout_secs),
        day_boundary: match config.forecast.day_boundaries {
            DayBoundaries::Local => DayBoundary::Local,
            DayBoundaries::Utc => DayBoundary::Utc,
        },
    })
}

pub fn geocoder_settings(config: &Config) -> GeocoderSettings {
    GeocoderSettings {
        base_url: config.geocoding.base_url.clone(),
        timeout: Duration::from_secs(config.geocoding.timeout_secs),
        user_agent: config.geocoding.user_agent.clone(),
    }
}

pub fn resolver_settings(config: &Config) -> Result<ResolverSettings, AppError> {
    let location = &config.location;
    let coordinate = coordinate(location.default_latitude, location.default_longitude)?;

    Ok(ResolverSettings {
        options: PositionOptions {
            high_accuracy: location.high_accuracy,
            timeout: Duration::from_secs(location.timeout_secs),
            max_cached_age: Duration::ZERO,
        },
        default_location: Location::new(coordinate, location.default_name.clone()),
    })
}

fn position_source(config: &Config) -> Result<ConfiguredPositionSource, AppError> {
    let location = &config.location;
    match location.source {
        LocationSourceKind::System => Ok(ConfiguredPositionSource::System(
            SystemPositionSource::new(DESKTOP_ID),
        )),
        LocationSourceKind::Fixed => match (location.fixed_latitude, location.fixed_longitude) {
            (Some(lat), Some(lon)) => Ok(ConfiguredPositionSource::Fixed(
                FixedPositionSource::new(coordinate(lat, lon)?),
            )),
            _ => Err(ConfigError::MissingSetting("location.fixed_latitude".to_string()).into()),
        },
    }
}

fn coordinate(latitude: f64, longitude: f64) -> Result<Coordinate, AppError> {
    Coordinate::new(latitude, longitude)
        .map_err(|e| ConfigError::Invalid(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        let mut config = Config::default();
        config.forecast.api_key = Some("test-key".to_string());
        config
    }

    #[test]
    fn test_forecast_settings_from_config() {
        let mut config = config();
        config.forecast.day_boundaries = DayBoundaries::Utc;
        config.forecast.timeout_secs = 3;

        let settings = forecast_settings(&config).unwrap();
        assert_eq!(settings.api_key, "test-key");
        assert_eq!(settings.day_boundary, DayBoundary::Utc);
        assert_eq!(settings.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let err = forecast_settings(&Config::default()).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::MissingSetting(ref k)) if k == API_KEY_ENV));
    }

    #[test]
    fn test_resolver_settings_default_location() {
        let settings = resolver_settings(&config()).unwrap();
        assert_eq!(settings.default_location.display_name, "Dhaka");
        assert_eq!(settings.default_location.coordinate.latitude, 23.8103);
        assert!(settings.options.high_accuracy);
        assert_eq!(settings.options.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_fixed_source_requires_coordinates() {
        let mut config = config();
        config.location.source = LocationSourceKind::Fixed;
        assert!(matches!(
            position_source(&config),
            Err(AppError::Config(ConfigError::MissingSetting(_)))
        ));

        config.location.fixed_latitude = Some(47.37);
        config.location.fixed_longitude = Some(8.54);
        assert!(matches!(
            position_source(&config),
            Ok(ConfiguredPositionSource::Fixed(_))
        ));

        config.location.fixed_latitude = Some(123.0);
        assert!(matches!(
            position_source(&config),
            Err(AppError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_forecast_needs_location_first() {
        let services = AppServices::from_config(&config()).unwrap();
        let mut model = DashboardModel::new();
        let range = DateRange::new(
            chrono::Local::now().date_naive(),
            chrono::Local::now().date_naive(),
        );
        assert!(!services.fetch_forecast(&mut model, range));
        assert!(services.wait_idle(&mut model, Duration::from_millis(10)));
        assert_eq!(services.drain(&mut model), 0);
        services.shutdown();
    }
}
