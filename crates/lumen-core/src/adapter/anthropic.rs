//! Anthropic vendor using the Messages API.
//!
//! Images are sent as typed content blocks whose source is either a remote
//! URL or base64 data with its media type.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::{AdapterCore, VisionAdapter, VisionModelResponse};
use crate::config::ModelConfig;
use crate::error::Result;
use crate::input::NormalizedImageInput;
use crate::thinking::ThinkingExtractor;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Thinking budget requested when extended thinking is on. The API requires
/// it to be below `max_tokens`.
const THINKING_BUDGET_TOKENS: u32 = 1024;

pub struct AnthropicAdapter {
    config: ModelConfig,
    core: AdapterCore,
}

impl AnthropicAdapter {
    pub fn new(config: ModelConfig, extractor: ThinkingExtractor) -> Result<Self> {
        let core = AdapterCore::new(&config, extractor)?;
        Ok(Self { config, core })
    }

    /// Users often configure the base URL with the version segment already
    /// attached; the path below adds it again.
    fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let base = base.strip_suffix("/v1").unwrap_or(base);
        format!("{base}/v1/messages")
    }

    fn thinking(&self) -> Option<ThinkingConfig> {
        if !self.config.thinking_enabled {
            return None;
        }
        if self.config.max_tokens <= THINKING_BUDGET_TOKENS {
            tracing::warn!(
                max_tokens = self.config.max_tokens,
                "max_tokens too small for extended thinking; sending without it"
            );
            return None;
        }
        Some(ThinkingConfig {
            kind: "enabled".to_string(),
            budget_tokens: THINKING_BUDGET_TOKENS,
        })
    }

    fn request_body(&self, image: &NormalizedImageInput, prompt: &str) -> MessagesRequest {
        let source = match image.base64_data() {
            Some(data) => ImageSource::Base64 {
                media_type: image.media_type().to_string(),
                data: data.to_string(),
            },
            None => ImageSource::Url {
                url: image.canonical.clone(),
            },
        };
        let thinking = self.thinking();

        MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Image { source },
                    ContentBlock::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            // extended thinking only accepts the default temperature
            temperature: thinking.is_none().then_some(self.config.temperature),
            thinking,
        }
    }
}

/// Registry factory.
pub fn create(config: ModelConfig, extractor: ThinkingExtractor) -> Result<Arc<dyn VisionAdapter>> {
    Ok(Arc::new(AnthropicAdapter::new(config, extractor)?))
}

// --- Request types ---

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingConfig>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "image")]
    Image { source: ImageSource },
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ImageSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

#[derive(Serialize)]
struct ThinkingConfig {
    #[serde(rename = "type")]
    kind: String,
    budget_tokens: u32,
}

#[async_trait]
impl VisionAdapter for AnthropicAdapter {
    fn provider(&self) -> &str {
        &self.config.provider
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn analyze_with_response(
        &self,
        image: &NormalizedImageInput,
        prompt: &str,
    ) -> Result<VisionModelResponse> {
        let body = self.request_body(image, prompt);
        let endpoint = self.endpoint();

        self.core
            .execute(|| {
                self.core
                    .client()
                    .post(&endpoint)
                    .header("x-api-key", &self.config.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::{data_image, fast_retry, model_config, url_image};
    use crate::error::ErrorKind;
    use crate::thinking::anthropic_extractor;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_for(config: ModelConfig) -> AnthropicAdapter {
        let mut adapter = AnthropicAdapter::new(config, anthropic_extractor).unwrap();
        adapter.core = adapter.core.with_retry(fast_retry(2));
        adapter
    }

    fn message(blocks: Value) -> Value {
        json!({
            "id": "msg_1",
            "type": "message",
            "model": "test-model",
            "content": blocks,
            "usage": {"input_tokens": 50, "output_tokens": 10}
        })
    }

    #[test]
    fn test_endpoint_strips_redundant_version() {
        for base in [
            "https://api.anthropic.com",
            "https://api.anthropic.com/",
            "https://api.anthropic.com/v1",
            "https://api.anthropic.com/v1/",
        ] {
            let adapter = adapter_for(model_config("anthropic", base));
            assert_eq!(adapter.endpoint(), "https://api.anthropic.com/v1/messages");
        }
    }

    #[test]
    fn test_image_source_variants() {
        let adapter = adapter_for(model_config("anthropic", "https://api.anthropic.com"));

        let body = serde_json::to_value(adapter.request_body(&data_image(), "p")).unwrap();
        assert_eq!(
            body["messages"][0]["content"][0],
            json!({"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": "AAAA"}})
        );
        assert_eq!(body["messages"][0]["content"][1], json!({"type": "text", "text": "p"}));
        assert!(body.get("thinking").is_none());

        let body =
            serde_json::to_value(adapter.request_body(&url_image("https://img.example/a.png"), "p")).unwrap();
        assert_eq!(
            body["messages"][0]["content"][0]["source"],
            json!({"type": "url", "url": "https://img.example/a.png"})
        );
    }

    #[test]
    fn test_thinking_requested_when_enabled() {
        let mut config = model_config("anthropic", "https://api.anthropic.com");
        config.thinking_enabled = true;
        let adapter = adapter_for(config);

        let body = serde_json::to_value(adapter.request_body(&data_image(), "p")).unwrap();
        assert_eq!(body["thinking"], json!({"type": "enabled", "budget_tokens": 1024}));
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_thinking_skipped_when_budget_does_not_fit() {
        let mut config = model_config("anthropic", "https://api.anthropic.com");
        config.thinking_enabled = true;
        config.max_tokens = 512;
        let body = serde_json::to_value(adapter_for(config).request_body(&data_image(), "p")).unwrap();
        assert!(body.get("thinking").is_none());
    }

    #[tokio::test]
    async fn test_headers_and_thinking_blocks_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test-key-123456"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message(json!([
                {"type": "thinking", "thinking": "SECRET chain of thought", "signature": "s"},
                {"type": "text", "text": "A lighthouse at dusk."}
            ]))))
            .expect(1)
            .mount(&server)
            .await;

        let response = adapter_for(model_config("anthropic", &format!("{}/v1", server.uri())))
            .analyze_with_response(&data_image(), "Describe")
            .await
            .unwrap();

        assert_eq!(response.content, "A lighthouse at dusk.");
        assert!(!response.content.contains("SECRET"));
        assert_eq!(response.usage.unwrap().total_tokens, 60);
    }

    #[tokio::test]
    async fn test_short_answer_with_thinking_fails_closed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message(json!([
                {"type": "thinking", "thinking": "the answer is probably a cat"},
                {"type": "text", "text": "Cat"}
            ]))))
            .mount(&server)
            .await;

        let text = adapter_for(model_config("anthropic", &server.uri()))
            .analyze(&data_image(), "Describe")
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_bad_request_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "type": "error",
                "error": {"type": "invalid_request_error", "message": "image too large"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = adapter_for(model_config("anthropic", &server.uri()))
            .analyze(&data_image(), "Describe")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiError);
        assert_eq!(err.status_code(), Some(400));
        assert!(err.message().contains("image too large"));
    }
}
