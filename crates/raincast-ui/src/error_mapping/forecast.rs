use crate::services::ForecastFetchError;
use raincast_core::{AppError, WeatherError};

impl From<ForecastFetchError> for AppError {
    fn from(e: ForecastFetchError) -> Self {
        match e {
            ForecastFetchError::Network(s) => AppError::Weather(WeatherError::ForecastFetchFailed(s)),
            ForecastFetchError::Cancelled => {
                AppError::Weather(WeatherError::ForecastFetchFailed("cancelled".to_string()))
            }
            ForecastFetchError::InvalidApiKey => AppError::Weather(WeatherError::InvalidApiKey),
        }
    }
}
