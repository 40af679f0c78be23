//! The resolved, immutable per-process model configuration.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use super::{resolve_env_var, Config, GoogleConfig};
use crate::error::{Result, VisionError};
use crate::registry::ProviderRegistry;
use crate::sanitize::mask_api_key;

/// Settings for the one active vendor, built once at startup from the file,
/// the environment, and the provider's registered defaults.
#[derive(Clone)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub thinking_enabled: bool,
    pub max_tokens: u32,
    pub temperature: f32,
    pub google: GoogleConfig,
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("thinking_enabled", &self.thinking_enabled)
            .finish_non_exhaustive()
    }
}

impl ModelConfig {
    /// Resolve against the registry using the process environment for
    /// vendor-conventional key variables.
    pub fn resolve(config: &Config, registry: &ProviderRegistry) -> Result<Self> {
        Self::resolve_with(config, registry, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit variable lookup.
    pub fn resolve_with<F>(config: &Config, registry: &ProviderRegistry, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = &config.provider;
        let definition = registry.get(&settings.name).ok_or_else(|| {
            VisionError::model_config(format!(
                "Unknown provider '{}'. Available: {}",
                settings.name,
                registry.ids().join(", ")
            ))
        })?;

        let api_key = settings
            .api_key
            .as_deref()
            .and_then(resolve_env_var)
            .or_else(|| lookup(definition.api_key_env).filter(|k| !k.trim().is_empty()))
            .map(|k| k.trim().to_string())
            .unwrap_or_default();

        if api_key.is_empty() && definition.requires_api_key {
            return Err(VisionError::model_config(format!(
                "{} API key not set. Set LUMEN_API_KEY or {}.",
                definition.display_name, definition.api_key_env
            ))
            .with_detail("provider", definition.id));
        }
        if let Some(validator) = definition.key_validator {
            if !api_key.is_empty() && !validator(&api_key) {
                tracing::warn!(
                    provider = definition.id,
                    "API key does not match the expected {} key format",
                    definition.display_name
                );
            }
        }

        let requested_thinking = settings.thinking.unwrap_or(false);
        if requested_thinking && !definition.thinking_enabled {
            tracing::warn!(
                provider = definition.id,
                "Thinking was requested but this provider does not support it; ignoring"
            );
        }

        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| definition.default_base_url.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            provider: definition.id.to_string(),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| definition.default_model.to_string()),
            base_url,
            api_key,
            timeout_ms: settings.timeout_ms.unwrap_or(definition.default_timeout_ms),
            max_retries: settings
                .max_retries
                .unwrap_or(definition.default_max_retries),
            thinking_enabled: requested_thinking && definition.thinking_enabled,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            google: settings.google.clone(),
        })
    }

    /// Per-attempt deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Introspection view with the API key masked.
    pub fn summary(&self, strict_url_validation: bool) -> ConfigSummary {
        ConfigSummary {
            provider: self.provider.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            api_key: mask_api_key(&self.api_key),
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
            thinking_enabled: self.thinking_enabled,
            max_tokens: self.max_tokens,
            strict_url_validation,
            api_version: (self.provider == "google").then(|| self.google.api_version.clone()),
        }
    }
}

/// Active configuration as reported to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub thinking_enabled: bool,
    pub max_tokens: u32,
    pub strict_url_validation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn config_for(provider: &str) -> Config {
        let mut config = Config::default();
        config.provider.name = provider.to_string();
        config
    }

    #[test]
    fn test_resolve_uses_provider_defaults() {
        let registry = ProviderRegistry::with_builtins();
        let mut config = config_for("anthropic");
        config.provider.api_key = Some("sk-ant-test-key".into());

        let resolved = ModelConfig::resolve_with(&config, &registry, no_env).unwrap();
        assert_eq!(resolved.provider, "anthropic");
        assert_eq!(resolved.base_url, "https://api.anthropic.com");
        assert_eq!(resolved.timeout_ms, 60_000);
        assert_eq!(resolved.max_retries, 2);
        assert!(!resolved.thinking_enabled);
    }

    #[test]
    fn test_resolve_overrides_win() {
        let registry = ProviderRegistry::with_builtins();
        let mut config = config_for("openai");
        config.provider.api_key = Some("sk-test".into());
        config.provider.model = Some("gpt-4.1".into());
        config.provider.base_url = Some("http://localhost:9999/v1/".into());
        config.provider.timeout_ms = Some(5_000);
        config.provider.max_retries = Some(0);

        let resolved = ModelConfig::resolve_with(&config, &registry, no_env).unwrap();
        assert_eq!(resolved.model, "gpt-4.1");
        assert_eq!(resolved.base_url, "http://localhost:9999/v1");
        assert_eq!(resolved.timeout(), Duration::from_millis(5_000));
        assert_eq!(resolved.max_retries, 0);
    }

    #[test]
    fn test_resolve_falls_back_to_vendor_key_variable() {
        let registry = ProviderRegistry::with_builtins();
        let config = config_for("openrouter");
        let resolved = ModelConfig::resolve_with(&config, &registry, |name| {
            (name == "OPENROUTER_API_KEY").then(|| "sk-or-abc".to_string())
        })
        .unwrap();
        assert_eq!(resolved.api_key, "sk-or-abc");
    }

    #[test]
    fn test_resolve_missing_key_is_model_config_error() {
        let registry = ProviderRegistry::with_builtins();
        let err = ModelConfig::resolve_with(&config_for("google"), &registry, no_env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelConfig);
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_resolve_unknown_provider() {
        let registry = ProviderRegistry::with_builtins();
        let err = ModelConfig::resolve_with(&config_for("acme"), &registry, no_env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelConfig);
        assert!(err.to_string().contains("acme"));
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn test_thinking_only_enabled_where_supported() {
        let registry = ProviderRegistry::with_builtins();

        let mut config = config_for("anthropic");
        config.provider.api_key = Some("sk-ant-k".into());
        config.provider.thinking = Some(true);
        assert!(ModelConfig::resolve_with(&config, &registry, no_env).unwrap().thinking_enabled);

        let mut config = config_for("hyperbolic");
        config.provider.api_key = Some("hb-key".into());
        config.provider.thinking = Some(true);
        assert!(!ModelConfig::resolve_with(&config, &registry, no_env).unwrap().thinking_enabled);
    }

    #[test]
    fn test_summary_masks_key_and_debug_redacts() {
        let registry = ProviderRegistry::with_builtins();
        let mut config = config_for("openai");
        config.provider.api_key = Some("sk-abcdefghijklmnop".into());
        let resolved = ModelConfig::resolve_with(&config, &registry, no_env).unwrap();

        let summary = resolved.summary(true);
        assert_eq!(summary.api_key, "sk-a****mnop");
        assert!(summary.api_version.is_none());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["baseUrl"], "https://api.openai.com/v1");
        assert_eq!(json["strictUrlValidation"], true);

        assert!(!format!("{resolved:?}").contains("abcdefghijklmnop"));
    }
}
