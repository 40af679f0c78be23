//! Provider registry.
//!
//! Maps provider ids to their defaults and adapter factories. Call sites only
//! ever see `Arc<dyn VisionAdapter>`, so adding a vendor means registering a
//! new [`ProviderDefinition`] and nothing else.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapter::{anthropic, google, openai, VisionAdapter};
use crate::config::ModelConfig;
use crate::error::{Result, VisionError};
use crate::thinking::{self, ThinkingExtractor};

/// Builds the adapter for a resolved configuration.
pub type AdapterFactory = fn(ModelConfig, ThinkingExtractor) -> Result<Arc<dyn VisionAdapter>>;

/// Static description of one vendor.
#[derive(Clone)]
pub struct ProviderDefinition {
    pub id: &'static str,
    pub display_name: &'static str,
    pub default_base_url: &'static str,
    pub default_model: &'static str,
    pub default_timeout_ms: u64,
    pub default_max_retries: u32,
    /// Vendor-conventional key variable consulted after `LUMEN_API_KEY`
    pub api_key_env: &'static str,
    pub requires_api_key: bool,
    /// Loose key-format check; a mismatch only warns
    pub key_validator: Option<fn(&str) -> bool>,
    pub factory: AdapterFactory,
    pub extractor: ThinkingExtractor,
    /// Whether the vendor can be asked for extended thinking
    pub thinking_enabled: bool,
}

/// Serializable listing entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    pub default_model: &'static str,
    pub default_base_url: &'static str,
    pub api_key_env: &'static str,
    pub thinking_supported: bool,
}

impl From<&ProviderDefinition> for ProviderInfo {
    fn from(definition: &ProviderDefinition) -> Self {
        Self {
            id: definition.id,
            display_name: definition.display_name,
            default_model: definition.default_model,
            default_base_url: definition.default_base_url,
            api_key_env: definition.api_key_env,
            thinking_supported: definition.thinking_enabled,
        }
    }
}

const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_MAX_RETRIES: u32 = 2;

fn openai_key(key: &str) -> bool {
    key.starts_with("sk-")
}

fn openrouter_key(key: &str) -> bool {
    key.starts_with("sk-or-")
}

fn anthropic_key(key: &str) -> bool {
    key.starts_with("sk-ant-")
}

fn google_key(key: &str) -> bool {
    key.starts_with("AIza")
}

/// Append-only set of provider definitions, keyed and ordered by id.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, ProviderDefinition>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with every built-in vendor.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for definition in builtin_definitions() {
            let registered = registry.register(definition);
            debug_assert!(registered.is_ok(), "built-in provider ids are unique");
        }
        registry
    }

    /// Register a provider. Ids are unique; re-registering is an error.
    pub fn register(&mut self, definition: ProviderDefinition) -> Result<()> {
        if definition.id.is_empty() {
            return Err(VisionError::model_config("Provider id cannot be empty"));
        }
        if self.providers.contains_key(definition.id) {
            return Err(VisionError::model_config(format!(
                "Provider already registered: {}",
                definition.id
            )));
        }
        tracing::debug!(provider = definition.id, "Registered provider");
        self.providers.insert(definition.id, definition);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ProviderDefinition> {
        self.providers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ProviderDefinition> {
        self.providers.values()
    }

    pub fn list(&self) -> Vec<ProviderInfo> {
        self.definitions().map(ProviderInfo::from).collect()
    }

    /// Build the adapter for `config` using its provider's factory and
    /// extractor.
    pub fn create_adapter(&self, config: &ModelConfig) -> Result<Arc<dyn VisionAdapter>> {
        let definition = self.get(&config.provider).ok_or_else(|| {
            VisionError::model_config(format!(
                "Unknown provider '{}'. Available: {}",
                config.provider,
                self.ids().join(", ")
            ))
        })?;
        tracing::info!(provider = definition.id, model = %config.model, "Creating vision adapter");
        (definition.factory)(config.clone(), definition.extractor)
    }
}

fn builtin_definitions() -> Vec<ProviderDefinition> {
    vec![
        ProviderDefinition {
            id: "openai",
            display_name: "OpenAI",
            default_base_url: "https://api.openai.com/v1",
            default_model: "gpt-4o-mini",
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            default_max_retries: DEFAULT_MAX_RETRIES,
            api_key_env: "OPENAI_API_KEY",
            requires_api_key: true,
            key_validator: Some(openai_key),
            factory: openai::create,
            extractor: thinking::openai_compatible_extractor,
            thinking_enabled: false,
        },
        ProviderDefinition {
            id: "openrouter",
            display_name: "OpenRouter",
            default_base_url: "https://openrouter.ai/api/v1",
            default_model: "openai/gpt-4o-mini",
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            default_max_retries: DEFAULT_MAX_RETRIES,
            api_key_env: "OPENROUTER_API_KEY",
            requires_api_key: true,
            key_validator: Some(openrouter_key),
            factory: openai::create,
            extractor: thinking::openai_compatible_extractor,
            thinking_enabled: false,
        },
        ProviderDefinition {
            id: "hyperbolic",
            display_name: "Hyperbolic",
            default_base_url: "https://api.hyperbolic.xyz/v1",
            default_model: "meta-llama/Llama-3.2-11B-Vision-Instruct",
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            default_max_retries: DEFAULT_MAX_RETRIES,
            api_key_env: "HYPERBOLIC_API_KEY",
            requires_api_key: true,
            key_validator: None,
            factory: openai::create,
            extractor: thinking::openai_compatible_extractor,
            thinking_enabled: false,
        },
        ProviderDefinition {
            id: "anthropic",
            display_name: "Anthropic",
            default_base_url: "https://api.anthropic.com",
            default_model: "claude-sonnet-4-20250514",
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            default_max_retries: DEFAULT_MAX_RETRIES,
            api_key_env: "ANTHROPIC_API_KEY",
            requires_api_key: true,
            key_validator: Some(anthropic_key),
            factory: anthropic::create,
            extractor: thinking::anthropic_extractor,
            thinking_enabled: true,
        },
        ProviderDefinition {
            id: "google",
            display_name: "Google Gemini",
            default_base_url: "https://generativelanguage.googleapis.com",
            default_model: "gemini-2.5-flash",
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            default_max_retries: DEFAULT_MAX_RETRIES,
            api_key_env: "GEMINI_API_KEY",
            requires_api_key: true,
            key_validator: Some(google_key),
            factory: google::create,
            extractor: thinking::google_extractor,
            thinking_enabled: true,
        },
    ]
}
