//! Error hierarchy shared by the Raincast crates.
//!
//! Variants keep the technical detail for logs; `user_message()` gives the
//! short text the dashboard shows instead.

use thiserror::Error;

/// Top-level error returned across crate boundaries.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Io(_) => "Could not read or write a local file.",
        }
    }
}

/// Transport-level failures talking to a remote service.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unreadable response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => "No connection to the weather service.",
            NetworkError::Timeout => "The weather service took too long to answer.",
            NetworkError::Status { status, .. } if *status >= 500 => {
                "The weather service is having trouble. Please try again later."
            }
            NetworkError::Status { .. } => "The weather service refused the request.",
            NetworkError::InvalidResponse(_) => "The weather service sent an unreadable answer.",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid setting: {0}")]
    Invalid(String),

    #[error("Missing setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "A setting in config.toml is out of range.",
            ConfigError::MissingSetting(_) => {
                "A required setting is missing. Set OPENWEATHER_API_KEY or edit config.toml."
            }
        }
    }
}

/// Forecast failures as the dashboard reports them.
///
/// Location and geocoding problems never surface here: they fall back to the
/// default location with a notice.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Forecast fetch failed: {0}")]
    ForecastFetchFailed(String),

    #[error("Forecast API key rejected")]
    InvalidApiKey,
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::ForecastFetchFailed(_) => {
                "Failed to fetch weather data. Please try again later."
            }
            WeatherError::InvalidApiKey => "The OpenWeatherMap API key was rejected. Check settings.",
        }
    }
}

/// Classify reqwest failures into [`NetworkError`].
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        let message = self.to_string();
        match self.status() {
            _ if self.is_timeout() => NetworkError::Timeout,
            Some(status) => NetworkError::Status {
                status: status.as_u16(),
                message,
            },
            None if self.is_decode() => NetworkError::InvalidResponse(message),
            None => NetworkError::ConnectionFailed(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_failure_message() {
        let err: AppError = WeatherError::ForecastFetchFailed("HTTP 500".into()).into();
        assert_eq!(
            err.user_message(),
            "Failed to fetch weather data. Please try again later."
        );
    }

    #[test]
    fn test_nested_errors_delegate_messages() {
        let err: AppError = ConfigError::MissingSetting("OPENWEATHER_API_KEY".into()).into();
        assert!(matches!(err, AppError::Config(ConfigError::MissingSetting(_))));
        assert!(err.user_message().contains("OPENWEATHER_API_KEY"));

        let err: AppError = NetworkError::Timeout.into();
        assert_eq!(err.user_message(), NetworkError::Timeout.user_message());
        assert!(err.to_string().starts_with("Network error"));
    }

    #[test]
    fn test_status_message_depends_on_code() {
        let server = NetworkError::Status {
            status: 503,
            message: "down".into(),
        };
        let client = NetworkError::Status {
            status: 404,
            message: "missing".into(),
        };
        assert!(server.user_message().contains("later"));
        assert!(!client.user_message().contains("later"));
    }
}
