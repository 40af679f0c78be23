//! OpenAI-compatible vendors using the Chat Completions API.
//!
//! OpenAI, OpenRouter and Hyperbolic share this wire format: the image goes
//! in as an `image_url` content part holding either the remote URL or the
//! data URL, authenticated with a bearer token.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::{AdapterCore, VisionAdapter, VisionModelResponse};
use crate::config::ModelConfig;
use crate::error::Result;
use crate::input::NormalizedImageInput;
use crate::thinking::ThinkingExtractor;

/// Chat Completions adapter parameterized by base URL.
pub struct OpenAiCompatibleAdapter {
    config: ModelConfig,
    core: AdapterCore,
}

impl OpenAiCompatibleAdapter {
    pub fn new(config: ModelConfig, extractor: ThinkingExtractor) -> Result<Self> {
        let core = AdapterCore::new(&config, extractor)?;
        Ok(Self { config, core })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn request_body(&self, image: &NormalizedImageInput, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ChatContent::ImageUrl {
                        image_url: ImageUrl {
                            url: image.canonical.clone(),
                        },
                    },
                    ChatContent::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            stream: false,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }
}

/// Registry factory.
pub fn create(config: ModelConfig, extractor: ThinkingExtractor) -> Result<Arc<dyn VisionAdapter>> {
    Ok(Arc::new(OpenAiCompatibleAdapter::new(config, extractor)?))
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ChatContent>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[async_trait]
impl VisionAdapter for OpenAiCompatibleAdapter {
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
                    .bearer_auth(&self.config.api_key)
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
    use crate::thinking::openai_compatible_extractor;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> OpenAiCompatibleAdapter {
        let mut adapter = OpenAiCompatibleAdapter::new(
            model_config("openai", &format!("{}/v1", server.uri())),
            openai_compatible_extractor,
        )
        .unwrap();
        adapter.core = adapter.core.with_retry(fast_retry(2));
        adapter
    }

    fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "model": "test-model",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        })
    }

    #[tokio::test]
    async fn test_request_shape_and_filtered_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test-key-123456"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion("<think>hmm</think>A tabby cat.")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = adapter(&server)
            .analyze_with_response(&url_image("https://img.example/cat.png"), "Describe")
            .await
            .unwrap();

        assert_eq!(response.content, "A tabby cat.");
        assert_eq!(response.usage.unwrap().total_tokens, 16);
        assert_eq!(response.model.as_deref(), Some("test-model"));

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 4096);
        let content = &body["messages"][0]["content"];
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(content[0]["type"], "image_url");
        assert_eq!(content[0]["image_url"]["url"], "https://img.example/cat.png");
        assert_eq!(content[1], json!({"type": "text", "text": "Describe"}));
    }

    #[tokio::test]
    async fn test_data_url_sent_inline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("A small square.")))
            .mount(&server)
            .await;

        let text = adapter(&server).analyze(&data_image(), "What is it?").await.unwrap();
        assert_eq!(text, "A small square.");

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(
            body["messages"][0]["content"][0]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key sk-test-key-123456"))
            .expect(1)
            .mount(&server)
            .await;

        let err = adapter(&server)
            .analyze(&data_image(), "Describe")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiError);
        assert_eq!(err.status_code(), Some(401));
        assert!(!err.message().contains("sk-test-key-123456"));
    }

    #[tokio::test]
    async fn test_server_error_retried_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Recovered fine.")))
            .mount(&server)
            .await;

        let text = adapter(&server).analyze(&data_image(), "Describe").await.unwrap();
        assert_eq!(text, "Recovered fine.");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .expect(3)
            .mount(&server)
            .await;

        let err = adapter(&server)
            .analyze(&data_image(), "Describe")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(err.retry_after_secs(), Some(3));
        assert_eq!(err.details()["attempts"], 3);
    }

    #[tokio::test]
    async fn test_missing_content_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .analyze(&data_image(), "Describe")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiError);
        assert!(err.to_string().contains("no recognizable content"));
    }
}
