//! Vision adapters: one uniform analyze contract over divergent vendor APIs.
//!
//! Each vendor strategy only knows how to build its HTTP request. Sending,
//! retrying, status mapping, payload extraction and thinking removal live in
//! the shared [`AdapterCore`] that every strategy owns.

pub mod anthropic;
pub mod google;
pub mod openai;
pub mod retry;

pub use anthropic::AnthropicAdapter;
pub use google::GoogleAdapter;
pub use openai::OpenAiCompatibleAdapter;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use serde::Serialize;
use serde_json::Value;

use crate::config::ModelConfig;
use crate::error::{Result, VisionError};
use crate::input::NormalizedImageInput;
use crate::sanitize::sanitize_text;
use crate::thinking::{filter_envelope, ThinkingExtractor, TokenUsage};

/// Longest slice of an error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Filtered model output. `content` never contains hidden reasoning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisionModelResponse {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Trait that all vision vendors implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (adapters are shared as `Arc<dyn VisionAdapter>`).
#[async_trait]
pub trait VisionAdapter: Send + Sync {
    /// Provider id (e.g., "openai", "google").
    fn provider(&self) -> &str;

    /// Model identifier sent upstream.
    fn model(&self) -> &str;

    /// Analyze an image and return only the filtered text.
    async fn analyze(&self, image: &NormalizedImageInput, prompt: &str) -> Result<String> {
        Ok(self.analyze_with_response(image, prompt).await?.content)
    }

    /// Analyze an image, keeping usage and model metadata.
    async fn analyze_with_response(
        &self,
        image: &NormalizedImageInput,
        prompt: &str,
    ) -> Result<VisionModelResponse>;
}

/// HTTP client, retry policy and response parser shared by every vendor.
pub(crate) struct AdapterCore {
    provider: String,
    client: reqwest::Client,
    retry: RetryPolicy,
    extractor: ThinkingExtractor,
}

impl AdapterCore {
    pub(crate) fn new(config: &ModelConfig, extractor: ThinkingExtractor) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lumen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(VisionError::unknown)?;

        Ok(Self {
            provider: config.provider.clone(),
            client,
            retry: RetryPolicy::from_config(config),
            extractor,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send the request built by `build` under the retry policy, then
    /// extract and filter the payload. `build` runs once per attempt.
    pub(crate) async fn execute<F>(&self, build: F) -> Result<VisionModelResponse>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let payload = self
            .retry
            .run(&self.provider, |attempt| {
                let request = build();
                async move {
                    tracing::debug!(provider = %self.provider, attempt = attempt + 1, "Sending vision request");
                    self.send_once(request).await
                }
            })
            .await?;
        self.parse(&payload)
    }

    async fn send_once(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            VisionError::api(
                &self.provider,
                format!("Request failed: {}", e.without_url()),
                None,
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::api(
                &self.provider,
                format!("HTTP {}: {}", status.as_u16(), truncate(&sanitize_text(&body))),
                Some(status.as_u16()),
            )
            .with_retry_after(retry_after)
            .with_detail("url", url));
        }

        response.json::<Value>().await.map_err(|e| {
            VisionError::api(
                &self.provider,
                format!("Failed to parse response body: {}", e.without_url()),
                None,
            )
        })
    }

    fn parse(&self, payload: &Value) -> Result<VisionModelResponse> {
        let envelope = (self.extractor)(payload);
        let content = match filter_envelope(&envelope) {
            Ok(Some(content)) => content,
            Ok(None) => {
                return Err(VisionError::api(
                    &self.provider,
                    "Response contained no recognizable content field",
                    None,
                ))
            }
            Err(e) => {
                tracing::warn!(provider = %self.provider, error = %e, "Thinking filter failed; returning unfiltered content");
                envelope.content.clone().unwrap_or_default()
            }
        };

        Ok(VisionModelResponse {
            content,
            usage: envelope.usage,
            model: envelope.model,
        })
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::GoogleConfig;

    pub fn model_config(provider: &str, base_url: &str) -> ModelConfig {
        ModelConfig {
            provider: provider.to_string(),
            model: "test-model".to_string(),
            base_url: base_url.to_string(),
            api_key: "sk-test-key-123456".to_string(),
            timeout_ms: 2_000,
            max_retries: 2,
            thinking_enabled: false,
            max_tokens: 4096,
            temperature: 0.2,
            google: GoogleConfig::default(),
        }
    }

    pub fn data_image() -> NormalizedImageInput {
        NormalizedImageInput {
            kind: crate::input::ImageInputKind::Base64,
            original: "data:image/png;base64,AAAA".to_string(),
            canonical: "data:image/png;base64,AAAA".to_string(),
            mime_type: "image/png".to_string(),
        }
    }

    pub fn url_image(url: &str) -> NormalizedImageInput {
        NormalizedImageInput {
            kind: crate::input::ImageInputKind::Url,
            original: url.to_string(),
            canonical: url.to_string(),
            mime_type: "image/png".to_string(),
        }
    }

    /// Millisecond backoff so retry tests stay fast.
    pub fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, std::time::Duration::from_secs(2)).with_backoff(5, 10)
    }
}
