use anyhow::Result;
use std::sync::Arc;

use crate::config::ValidationResult;
use crate::Config;

/// Application state and lifecycle manager.
///
/// Holds the immutable configuration that every client is built from.
pub struct App {
    config: Arc<Config>,
    validation: ValidationResult,
}

impl App {
    /// Create a new application instance from the on-disk configuration
    pub fn new() -> Result<Self> {
        let (config, validation) = Config::load_validated()?;
        Ok(Self::with_config(config, validation))
    }

    /// Create an application around an already loaded configuration
    pub fn with_config(config: Config, validation: ValidationResult) -> Self {
        Self {
            config: Arc::new(config),
            validation,
        }
    }

    /// Initialize the application
    pub fn initialize(&mut self) -> Result<()> {
        tracing::info!(
            config_dir = %self.config.config_dir.display(),
            warnings = self.validation.warnings.len(),
            "Initializing application"
        );
        tracing::info!("Application initialized successfully");
        Ok(())
    }

    /// Shutdown the application
    pub fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down application");
        Ok(())
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the configuration for injection into clients
    pub fn shared_config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Warnings produced while validating the configuration
    pub fn warnings(&self) -> &ValidationResult {
        &self.validation
    }
}
