use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable holding the OpenWeatherMap API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// One problem found in a config field
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)
    }
}

/// Problems found by [`Config::validate`]. Only errors make a config unusable.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(entry(field, message));
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(entry(field, message));
    }

    /// All errors on one line, empty when valid.
    pub fn error_summary(&self) -> String {
        let parts: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        parts.join("; ")
    }
}

fn entry(field: impl Into<String>, message: impl Into<String>) -> ConfigValidationError {
    ConfigValidationError {
        field: field.into(),
        message: message.into(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory, never read from the file
    #[serde(skip, default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Forecast provider settings
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Device location and fallback settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Reverse geocoding settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Chart output settings
    #[serde(default)]
    pub chart: ChartConfig,
}

/// Which timezone calendar-day boundaries are computed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundaries {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// OpenWeatherMap API key. Overridden by `OPENWEATHER_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the 2.5 API (the `/forecast` path is appended)
    #[serde(default = "default_forecast_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timezone used for the start/end of the selected days
    #[serde(default)]
    pub day_boundaries: DayBoundaries,
}

fn default_forecast_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_forecast_base_url(),
            timeout_secs: default_timeout_secs(),
            day_boundaries: DayBoundaries::default(),
        }
    }
}

impl ForecastConfig {
    /// Returns the API key if one is set and is not a placeholder.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.starts_with("YOUR_"))
    }
}

/// Where device coordinates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationSourceKind {
    /// Platform location service (GeoClue on Linux)
    #[default]
    System,
    /// The `fixed_latitude` / `fixed_longitude` pair
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub source: LocationSourceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_longitude: Option<f64>,

    /// Ask the location service for its most accurate fix
    #[serde(default = "default_high_accuracy")]
    pub high_accuracy: bool,

    /// Position request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Location used when the device position is unavailable
    #[serde(default = "default_location_name")]
    pub default_name: String,

    #[serde(default = "default_latitude")]
    pub default_latitude: f64,

    #[serde(default = "default_longitude")]
    pub default_longitude: f64,
}

fn default_high_accuracy() -> bool {
    true
}

fn default_location_name() -> String {
    "Dhaka".to_string()
}

fn default_latitude() -> f64 {
    23.8103
}

fn default_longitude() -> f64 {
    90.4125
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSourceKind::default(),
            fixed_latitude: None,
            fixed_longitude: None,
            high_accuracy: default_high_accuracy(),
            timeout_secs: default_timeout_secs(),
            default_name: default_location_name(),
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Nominatim base URL (the `/reverse` path is appended)
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Nominatim requires an identifying User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    concat!("Raincast/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Where to write the rendered SVG chart; nothing is written when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    #[serde(default = "default_chart_width")]
    pub width: u32,

    #[serde(default = "default_chart_height")]
    pub height: u32,
}

fn default_chart_width() -> u32 {
    960
}

fn default_chart_height() -> u32 {
    480
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_path: None,
            width: default_chart_width(),
            height: default_chart_height(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("raincast")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            forecast: ForecastConfig::default(),
            location: LocationConfig::default(),
            geocoding: GeocodingConfig::default(),
            chart: ChartConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, using defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Load configuration from an explicit path. A missing file means defaults.
    ///
    /// Environment overrides are not applied.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Apply the environment-provided API key; it takes precedence over the file.
    pub fn apply_env(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            tracing::debug!("Using forecast API key from {}", API_KEY_ENV);
            self.forecast.api_key = Some(key);
        }
    }

    /// Load, then validate.
    ///
    /// Fails when validation reports errors; warnings are logged and returned.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Check every section; nothing is fixed up in place.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.forecast.api_key().is_none() {
            result.add_error(
                "forecast.api_key",
                format!("No API key configured (set {})", API_KEY_ENV),
            );
        }

        check_url(&self.forecast.base_url, "forecast.base_url", &mut result);
        check_url(&self.geocoding.base_url, "geocoding.base_url", &mut result);

        for (field, secs) in [
            ("forecast.timeout_secs", self.forecast.timeout_secs),
            ("location.timeout_secs", self.location.timeout_secs),
            ("geocoding.timeout_secs", self.geocoding.timeout_secs),
        ] {
            if secs == 0 {
                result.add_error(field, "Timeout must be greater than 0");
            } else if secs > 300 {
                result.add_warning(field, "Timeout is unusually long (>5 minutes)");
            }
        }

        validate_coordinate(
            self.location.default_latitude,
            self.location.default_longitude,
            "location.default",
            &mut result,
        );

        if self.location.default_name.trim().is_empty() {
            result.add_warning("location.default_name", "Default location has no name");
        }

        if self.location.source == LocationSourceKind::Fixed {
            match (self.location.fixed_latitude, self.location.fixed_longitude) {
                (Some(lat), Some(lon)) => {
                    validate_coordinate(lat, lon, "location.fixed", &mut result)
                }
                _ => result.add_error(
                    "location.source",
                    "Fixed source requires fixed_latitude and fixed_longitude",
                ),
            }
        }

        if self.chart.width == 0 || self.chart.height == 0 {
            result.add_error("chart", "Chart dimensions must be greater than 0");
        } else if self.chart.width > 10000 || self.chart.height > 10000 {
            result.add_warning("chart", "Chart dimensions are unusually large (>10000)");
        }

        result
    }

    /// `<config dir>/raincast/config.toml`
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("raincast");

        Ok(config_dir.join("config.toml"))
    }
}

/// Endpoints must be absolute http(s) URLs with a host.
fn check_url(value: &str, field: &str, result: &mut ValidationResult) {
    let url = match Url::parse(value) {
        Ok(url) => url,
        Err(e) => {
            result.add_error(field, format!("'{}' is not a URL: {}", value, e));
            return;
        }
    };
    if !matches!(url.scheme(), "http" | "https") {
        result.add_error(field, format!("Scheme must be http or https, not {}", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        result.add_error(field, "URL has no host");
    }
}

fn validate_coordinate(lat: f64, lon: f64, field: &str, result: &mut ValidationResult) {
    if !(-90.0..=90.0).contains(&lat) {
        result.add_error(
            format!("{}_latitude", field),
            format!("Latitude {} is outside [-90, 90]", lat),
        );
    }
    if !(-180.0..=180.0).contains(&lon) {
        result.add_error(
            format!("{}_longitude", field),
            format!("Longitude {} is outside [-180, 180]", lon),
        );
    }
}
