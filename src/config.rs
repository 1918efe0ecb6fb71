// Booking core configuration

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::backend::BackendConfig;
use crate::filters::Currency;
use crate::session::AdminCredentials;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    // display currency for quotes; prices are never converted
    pub currency: Currency,
    pub persistence_timeout_ms: u64,
    pub backend: Option<BackendConfig>,
    pub admin: Option<AdminCredentials>,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            currency: Currency::Kes,
            persistence_timeout_ms: 10_000,
            backend: None,
            admin: None,
        }
    }
}

impl BookingConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: BookingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.persistence_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "persistence_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(backend) = &self.backend {
            if backend.base_url.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "backend.base_url must not be empty".to_string(),
                ));
            }
            if backend.api_key.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "backend.api_key must not be empty".to_string(),
                ));
            }
        }
        if let Some(admin) = &self.admin {
            if admin.email.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "admin.email must not be empty".to_string(),
                ));
            }
            if !admin.has_secure_password() {
                return Err(ConfigError::Invalid(
                    "admin.password must be at least 12 characters with upper and lower case letters, a digit and a special character".to_string(),
                ));
            }
        }
        Ok(())
    }
}
