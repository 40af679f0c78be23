//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.name must not be empty".into(),
            ));
        }
        if self.provider.timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "provider.timeout_ms must be > 0".into(),
            ));
        }
        if self.provider.max_retries.is_some_and(|r| r > 10) {
            return Err(ConfigError::ValidationError(
                "provider.max_retries must be <= 10".into(),
            ));
        }
        if self.provider.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "provider.max_tokens must be > 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if let Some(base_url) = &self.provider.base_url {
            let parsed = url::Url::parse(base_url).map_err(|e| {
                ConfigError::ValidationError(format!("provider.base_url is not a valid URL: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::ValidationError(
                    "provider.base_url must use http or https".into(),
                ));
            }
        }
        if self.provider.google.api_version.trim().is_empty()
            || self.provider.google.api_version.contains('/')
        {
            return Err(ConfigError::ValidationError(
                "provider.google.api_version must be a single path segment".into(),
            ));
        }
        if self.image.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "image.max_file_size_mb must be > 0".into(),
            ));
        }
        Ok(())
    }
}
