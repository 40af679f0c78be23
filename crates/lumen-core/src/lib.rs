//! Lumen Core - Provider-agnostic image analysis library.
//!
//! Lumen offers one operation, "analyze this image with this prompt", over
//! interchangeable multimodal model vendors chosen at startup.
//!
//! # Architecture
//!
//! ```text
//! image + prompt → Normalize → Template → Adapter (retry, timeout) → Extract → Strip thinking → result
//! ```
//!
//! Vendors are described by a [`ProviderRegistry`]; every vendor is reached
//! through the same [`VisionAdapter`] trait object. Hidden model reasoning is
//! removed inside the adapter layer and never reaches callers, and every
//! error leaves as a sanitized [`ErrorEnvelope`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::{AnalyzeRequest, Config, Lumen};
//!
//! #[tokio::main]
//! async fn main() -> lumen_core::Result<()> {
//!     let config = Config::load()?;
//!     let lumen = Lumen::new(config)?;
//!
//!     let result = lumen.analyze(&AnalyzeRequest::new("./chart.png", "Summarize the trend")).await?;
//!     println!("{}", result.content);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod adapter;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod input;
pub mod registry;
pub mod sanitize;
pub mod templates;
pub mod thinking;

// Re-exports for convenient access
pub use adapter::{VisionAdapter, VisionModelResponse};
pub use analyzer::{AnalysisResult, AnalyzeRequest, AnalyzeResponse, Analyzer, ResponseFormat};
pub use config::{Config, ConfigSummary, ModelConfig};
pub use error::{ConfigError, ErrorEnvelope, ErrorKind, Result, VisionError};
pub use input::{ImageNormalizer, NormalizedImageInput};
pub use registry::{ProviderDefinition, ProviderRegistry};
pub use templates::{PromptTemplate, TemplateCatalog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lumen - the main entry point, wiring configuration, registry and analyzer
/// in their fixed construction order.
pub struct Lumen {
    config: Config,
    registry: ProviderRegistry,
    analyzer: Analyzer,
}

impl Lumen {
    /// Create a new Lumen instance with the built-in providers.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_registry(config, ProviderRegistry::with_builtins())
    }

    /// Create a new Lumen instance with a caller-supplied registry.
    ///
    /// The configuration is validated here as well, since it may have been
    /// built in code rather than loaded.
    pub fn with_registry(config: Config, registry: ProviderRegistry) -> Result<Self> {
        tracing::debug!("Initializing Lumen v{}", VERSION);
        config.validate()?;
        let model = ModelConfig::resolve(&config, &registry)?;
        let analyzer = Analyzer::new(model, &config.image, &registry)?
            .with_debug_errors(config.logging.is_debug());
        Ok(Self {
            config,
            registry,
            analyzer,
        })
    }

    /// Create a new Lumen instance from the config file and environment.
    pub fn from_env() -> Result<Self> {
        let config = Config::load()?;
        Self::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult> {
        self.analyzer.analyze(request).await
    }

    /// Like [`Lumen::analyze`] but never fails; errors come back sanitized.
    pub async fn handle_analyze(&self, request: &AnalyzeRequest) -> AnalyzeResponse {
        self.analyzer.handle_analyze(request).await
    }

    pub fn templates(&self) -> &[PromptTemplate] {
        self.analyzer.templates()
    }

    pub fn config_summary(&self) -> ConfigSummary {
        self.analyzer.config_summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_lumen_new_with_key() {
        let mut config = Config::default();
        config.provider.name = "anthropic".to_string();
        config.provider.api_key = Some("sk-ant-abcdefgh1234".to_string());

        let lumen = Lumen::new(config).unwrap();
        let summary = lumen.config_summary();
        assert_eq!(summary.provider, "anthropic");
        assert_eq!(summary.api_key, "sk-a****1234");
        assert_eq!(lumen.templates().len(), 5);
        assert_eq!(lumen.registry().ids().len(), 5);
    }

    #[test]
    fn test_lumen_unknown_provider_is_model_config_error() {
        let mut config = Config::default();
        config.provider.name = "nope".to_string();
        config.provider.api_key = Some("k".to_string());

        let err = Lumen::new(config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ModelConfig);
    }

    #[test]
    fn test_lumen_rejects_out_of_range_config() {
        let mut config = Config::default();
        config.provider.api_key = Some("sk-abcdefgh1234".to_string());
        config.provider.max_retries = Some(u32::MAX);

        let err = Lumen::new(config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ModelConfig);
        assert!(err.message().contains("max_retries"));
    }
}
