//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Vendor selection and per-vendor overrides.
///
/// Everything optional here falls back to the selected provider's
/// registered defaults when the [`ModelConfig`](super::ModelConfig) is resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider id ("openai", "openrouter", "hyperbolic", "anthropic", "google")
    pub name: String,

    /// API key (supports ${ENV_VAR} syntax). Falls back to the vendor's
    /// conventional variable, e.g. OPENAI_API_KEY.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Base URL override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Per-attempt timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Retries after the first attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Ask the vendor for extended thinking (always filtered from output)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<bool>,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature (OpenAI-compatible vendors only)
    pub temperature: f32,

    /// Google-specific settings
    pub google: GoogleConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "openai".to_string(),
            api_key: None,
            model: None,
            base_url: None,
            timeout_ms: None,
            max_retries: None,
            thinking: None,
            max_tokens: 4096,
            temperature: 0.2,
            google: GoogleConfig::default(),
        }
    }
}

/// How the Google adapter authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoogleAuth {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-goog-api-key: <key>`
    Header,
    /// `?key=<key>` on the request URL
    Query,
}

impl GoogleAuth {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bearer" | "oauth" => Some(Self::Bearer),
            "header" | "x-goog-api-key" => Some(Self::Header),
            "query" | "key" => Some(Self::Query),
            _ => None,
        }
    }
}

/// Shape of the inline image part sent to Google.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePartEncoding {
    /// `{"inline_data": {"mime_type": ..., "data": ...}}`
    Nested,
    /// Legacy `{"mime_type": ..., "data": ...}` directly on the part
    Flat,
}

impl ImagePartEncoding {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "nested" | "inline_data" => Some(Self::Nested),
            "flat" | "legacy" => Some(Self::Flat),
            _ => None,
        }
    }
}

/// Google Generative Language API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// API version path segment ("v1beta", "v1")
    pub api_version: String,

    /// Authentication transport
    pub auth: GoogleAuth,

    /// Inline image part encoding
    pub image_part: ImagePartEncoding,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_version: "v1beta".to_string(),
            auth: GoogleAuth::Header,
            image_part: ImagePartEncoding::Nested,
        }
    }
}

/// Image input handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Reject URLs whose path lacks a supported image extension
    pub strict_url_validation: bool,

    /// Maximum local file size in megabytes
    pub max_file_size_mb: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            strict_url_validation: true,
            max_file_size_mb: 20,
        }
    }
}

impl ImageConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Whether errors should carry their full source chain.
    pub fn is_debug(&self) -> bool {
        matches!(self.level.as_str(), "debug" | "trace")
    }
}
