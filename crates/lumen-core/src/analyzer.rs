//! Analysis orchestration.
//!
//! An [`Analyzer`] is built once per process and shared. Each call
//! normalizes the image, composes the prompt from a template, invokes the
//! adapter, and assembles the result with its metadata.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::adapter::VisionAdapter;
use crate::config::{ConfigSummary, ImageConfig, ModelConfig};
use crate::error::{ErrorEnvelope, Result, VisionError};
use crate::input::ImageNormalizer;
use crate::registry::ProviderRegistry;
use crate::templates::{compose_prompt, PromptTemplate, TemplateCatalog};
use crate::thinking::TokenUsage;

/// Requested shape of the answer. JSON only changes the prompt; the model's
/// output is not validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

impl ResponseFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(VisionError::invalid_input(format!(
                "Unsupported output format '{other}'. Supported: text, json"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// One analyze call as received from the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    /// Local path, http(s) URL, or `data:image/...;base64,` URL
    pub image: String,
    pub prompt: String,
    #[serde(default, alias = "outputFormat")]
    pub output_format: ResponseFormat,
    #[serde(default)]
    pub template: Option<String>,
}

impl AnalyzeRequest {
    pub fn new(image: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            prompt: prompt.into(),
            output_format: ResponseFormat::Text,
            template: None,
        }
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub provider: String,
    pub model: String,
    /// MIME type of the image as sent
    pub image_format: String,
    pub processing_time_ms: u64,
    /// Size of the canonical image payload (URL or data URL)
    pub image_size_bytes: usize,
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub content: String,
    pub format: ResponseFormat,
    pub metadata: AnalysisMetadata,
}

/// What the outermost handler returns: a result, or a sanitized error with
/// `isError` set. Never an unsanitized failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl AnalyzeResponse {
    pub fn success(result: AnalysisResult) -> Self {
        Self {
            is_error: false,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: ErrorEnvelope) -> Self {
        Self {
            is_error: true,
            result: None,
            error: Some(error),
        }
    }
}

/// Process-wide orchestrator over one resolved configuration and adapter.
pub struct Analyzer {
    config: ModelConfig,
    adapter: Arc<dyn VisionAdapter>,
    normalizer: ImageNormalizer,
    templates: TemplateCatalog,
    strict_url_validation: bool,
    debug_errors: bool,
}

impl Analyzer {
    /// Build the adapter for `config` through the registry.
    pub fn new(config: ModelConfig, image: &ImageConfig, registry: &ProviderRegistry) -> Result<Self> {
        let adapter = registry.create_adapter(&config)?;
        Ok(Self::with_adapter(config, image, adapter))
    }

    pub fn with_adapter(config: ModelConfig, image: &ImageConfig, adapter: Arc<dyn VisionAdapter>) -> Self {
        Self {
            config,
            adapter,
            normalizer: ImageNormalizer::from_config(image),
            templates: TemplateCatalog::builtin(),
            strict_url_validation: image.strict_url_validation,
            debug_errors: false,
        }
    }

    /// Attach the source chain to error envelopes.
    pub fn with_debug_errors(mut self, debug: bool) -> Self {
        self.debug_errors = debug;
        self
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn templates(&self) -> &[PromptTemplate] {
        self.templates.list()
    }

    /// Active configuration with the API key masked.
    pub fn config_summary(&self) -> ConfigSummary {
        self.config.summary(self.strict_url_validation)
    }

    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult> {
        let start = Instant::now();

        if request.prompt.trim().is_empty() {
            return Err(VisionError::invalid_input("Prompt must not be empty"));
        }
        let template = self
            .templates
            .select(request.template.as_deref(), &request.prompt)?;
        let image = self.normalizer.normalize(&request.image).await?;
        let prompt = compose_prompt(template, &request.prompt, request.output_format);

        tracing::debug!(
            provider = self.adapter.provider(),
            kind = ?image.kind,
            mime_type = %image.mime_type,
            template = template.name,
            "Analyzing image"
        );

        let response = self.adapter.analyze_with_response(&image, &prompt).await?;
        let processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            provider = self.adapter.provider(),
            model = self.adapter.model(),
            processing_time_ms,
            content_chars = response.content.chars().count(),
            "Analysis complete"
        );

        Ok(AnalysisResult {
            content: response.content,
            format: request.output_format,
            metadata: AnalysisMetadata {
                provider: self.adapter.provider().to_string(),
                model: self.adapter.model().to_string(),
                image_format: image.mime_type.clone(),
                processing_time_ms,
                image_size_bytes: image.encoded_size(),
                template: template.name.to_string(),
                usage: response.usage,
            },
        })
    }

    /// Outermost handler: never fails, converts errors into sanitized
    /// envelopes.
    pub async fn handle_analyze(&self, request: &AnalyzeRequest) -> AnalyzeResponse {
        match self.analyze(request).await {
            Ok(result) => AnalyzeResponse::success(result),
            Err(e) => {
                tracing::warn!(kind = %e.kind(), "Analysis failed");
                AnalyzeResponse::failure(e.to_envelope(self.debug_errors))
            }
        }
    }
}
