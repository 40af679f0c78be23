//! Configuration management for lumen.
//!
//! Configuration is loaded from an optional `config.toml` in the platform
//! config directory, then overlaid with `LUMEN_*` environment variables, then
//! validated. The result is resolved once per process into a [`ModelConfig`]
//! against the provider registry.

mod model;
mod types;
mod validate;

pub use model::{ConfigSummary, ModelConfig};
pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for lumen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Vendor selection and overrides
    pub provider: ProviderConfig,

    /// Image input handling
    pub image: ImageConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location, then apply the
    /// process environment.
    ///
    /// Starts from defaults if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path (no environment overlay).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Overlay settings from environment variables.
    ///
    /// `lookup` returns the value of a variable, so tests can supply a map
    /// instead of touching the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(name) = get("LUMEN_PROVIDER") {
            self.provider.name = name.trim().to_lowercase();
        }
        if let Some(key) = get("LUMEN_API_KEY") {
            self.provider.api_key = Some(key.trim().to_string());
        }
        if let Some(model) = get("LUMEN_MODEL") {
            self.provider.model = Some(model.trim().to_string());
        }
        if let Some(base_url) = get("LUMEN_BASE_URL") {
            self.provider.base_url = Some(base_url.trim().to_string());
        }
        if let Some(raw) = get("LUMEN_TIMEOUT_MS") {
            self.provider.timeout_ms = Some(parse_number("LUMEN_TIMEOUT_MS", &raw)?);
        }
        if let Some(raw) = get("LUMEN_MAX_RETRIES") {
            self.provider.max_retries = Some(parse_number("LUMEN_MAX_RETRIES", &raw)?);
        }
        if let Some(raw) = get("LUMEN_MAX_TOKENS") {
            self.provider.max_tokens = parse_number("LUMEN_MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = get("LUMEN_THINKING") {
            self.provider.thinking = Some(parse_bool("LUMEN_THINKING", &raw)?);
        }
        if let Some(raw) = get("LUMEN_STRICT_URL_VALIDATION") {
            self.image.strict_url_validation = parse_bool("LUMEN_STRICT_URL_VALIDATION", &raw)?;
        }
        if let Some(level) = get("LUMEN_LOG_LEVEL") {
            self.logging.level = level.trim().to_lowercase();
        }
        if let Some(version) = get("GOOGLE_API_VERSION") {
            self.provider.google.api_version = version.trim().to_string();
        }
        if let Some(raw) = get("LUMEN_GOOGLE_AUTH") {
            self.provider.google.auth = GoogleAuth::parse(raw.trim()).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "LUMEN_GOOGLE_AUTH must be one of bearer, header, query (got '{raw}')"
                ))
            })?;
        }
        if let Some(raw) = get("LUMEN_GOOGLE_IMAGE_PART") {
            self.provider.google.image_part =
                ImagePartEncoding::parse(raw.trim()).ok_or_else(|| {
                    ConfigError::ValidationError(format!(
                        "LUMEN_GOOGLE_IMAGE_PART must be nested or flat (got '{raw}')"
                    ))
                })?;
        }
        Ok(())
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.lumen.lumen/config.toml
    /// - Linux: ~/.config/lumen/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\lumen\config\config.toml
    ///
    /// Falls back to ~/.lumen/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "lumen", "lumen")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".lumen").join("config.toml")
            })
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!("{name} must be a non-negative integer (got '{raw}')"))
    })
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::ValidationError(format!(
            "{name} must be a boolean (got '{raw}')"
        ))),
    }
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.name, "openai");
        assert!(config.image.strict_url_validation);
        assert_eq!(config.provider.google.api_version, "v1beta");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_max_file_size_bytes_saturates() {
        let mut config = Config::default();
        assert_eq!(config.image.max_file_size_bytes(), 20 * 1024 * 1024);
        config.image.max_file_size_mb = u64::MAX;
        assert_eq!(config.image.max_file_size_bytes(), u64::MAX);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[provider]"));
        assert!(toml.contains("[image]"));
        assert!(toml.contains("[provider.google]"));
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("LUMEN_PROVIDER", "Anthropic"),
                ("LUMEN_API_KEY", "sk-ant-xyz"),
                ("LUMEN_MODEL", "claude-x"),
                ("LUMEN_TIMEOUT_MS", "1500"),
                ("LUMEN_MAX_RETRIES", "0"),
                ("LUMEN_STRICT_URL_VALIDATION", "false"),
                ("GOOGLE_API_VERSION", "v1"),
                ("LUMEN_GOOGLE_AUTH", "query"),
                ("LUMEN_GOOGLE_IMAGE_PART", "flat"),
            ]))
            .unwrap();

        assert_eq!(config.provider.name, "anthropic");
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-ant-xyz"));
        assert_eq!(config.provider.model.as_deref(), Some("claude-x"));
        assert_eq!(config.provider.timeout_ms, Some(1500));
        assert_eq!(config.provider.max_retries, Some(0));
        assert!(!config.image.strict_url_validation);
        assert_eq!(config.provider.google.api_version, "v1");
        assert_eq!(config.provider.google.auth, GoogleAuth::Query);
        assert_eq!(config.provider.google.image_part, ImagePartEncoding::Flat);
    }

    #[test]
    fn test_apply_env_ignores_blank_values() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("LUMEN_PROVIDER", "  "), ("LUMEN_MODEL", "")]))
            .unwrap();
        assert_eq!(config.provider.name, "openai");
        assert!(config.provider.model.is_none());
    }

    #[test]
    fn test_apply_env_rejects_bad_numbers_and_bools() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("LUMEN_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("LUMEN_TIMEOUT_MS"));

        let err = config
            .apply_env(env(&[("LUMEN_STRICT_URL_VALIDATION", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("LUMEN_STRICT_URL_VALIDATION"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[provider]\nname = \"google\"\nmodel = \"gemini-2.5-pro\"\n\n[provider.google]\nauth = \"bearer\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.provider.name, "google");
        assert_eq!(config.provider.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(config.provider.google.auth, GoogleAuth::Bearer);
        assert_eq!(config.provider.google.image_part, ImagePartEncoding::Nested);
    }

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }
}
