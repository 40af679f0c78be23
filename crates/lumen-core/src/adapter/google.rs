//! Google vendor using the Generative Language `generateContent` API.
//!
//! This API does not take bare image URLs, so remote images are downloaded
//! and sent inline. Authentication and the inline part shape are
//! configurable because proxies and older API versions differ.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::{AdapterCore, VisionAdapter, VisionModelResponse};
use crate::config::{GoogleAuth, ImagePartEncoding, ModelConfig};
use crate::error::{Result, VisionError};
use crate::input::{download, ImageInputKind, NormalizedImageInput};
use crate::thinking::ThinkingExtractor;

const THINKING_BUDGET_TOKENS: u32 = 1024;

pub struct GoogleAdapter {
    config: ModelConfig,
    core: AdapterCore,
}

impl GoogleAdapter {
    pub fn new(config: ModelConfig, extractor: ThinkingExtractor) -> Result<Self> {
        let core = AdapterCore::new(&config, extractor)?;
        Ok(Self { config, core })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.config.base_url, self.config.google.api_version, self.config.model
        )
    }

    /// Resolve the image into `(mime_type, base64)`, downloading URL inputs.
    async fn inline_image(&self, image: &NormalizedImageInput) -> Result<(String, String)> {
        if image.kind == ImageInputKind::Url {
            let downloaded = download::fetch_inline(self.core.client(), &image.canonical).await?;
            return Ok((downloaded.mime_type, downloaded.data));
        }
        let data = image.base64_data().ok_or_else(|| {
            VisionError::invalid_input("Image data URL has no base64 payload")
        })?;
        Ok((image.media_type().to_string(), data.to_string()))
    }

    fn image_part(&self, mime_type: String, data: String) -> Part {
        match self.config.google.image_part {
            ImagePartEncoding::Nested => Part::InlineData {
                inline_data: InlineData { mime_type, data },
            },
            ImagePartEncoding::Flat => Part::Flat { mime_type, data },
        }
    }

    fn request_body(&self, image_part: Part, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    image_part,
                    Part::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
                thinking_config: self.config.thinking_enabled.then_some(ThinkingConfig {
                    thinking_budget: THINKING_BUDGET_TOKENS,
                }),
            },
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = &self.config.api_key;
        match self.config.google.auth {
            GoogleAuth::Bearer => request.bearer_auth(key),
            GoogleAuth::Header => request.header("x-goog-api-key", key),
            GoogleAuth::Query => request.query(&[("key", key)]),
        }
    }
}

/// Registry factory.
pub fn create(config: ModelConfig, extractor: ThinkingExtractor) -> Result<Arc<dyn VisionAdapter>> {
    Ok(Arc::new(GoogleAdapter::new(config, extractor)?))
}

// --- Request types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
    Flat { mime_type: String, data: String },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[async_trait]
impl VisionAdapter for GoogleAdapter {
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
        let (mime_type, data) = self.inline_image(image).await?;
        let body = self.request_body(self.image_part(mime_type, data), prompt);
        let endpoint = self.endpoint();

        self.core
            .execute(|| self.authorize(self.core.client().post(&endpoint)).json(&body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::{data_image, fast_retry, model_config, url_image};
    use crate::error::ErrorKind;
    use crate::thinking::google_extractor;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "AIzaTESTKEY1234567890";

    fn config(base: &str) -> ModelConfig {
        let mut config = model_config("google", base);
        config.model = "gemini-2.5-flash".to_string();
        config.api_key = KEY.to_string();
        config
    }

    fn adapter_for(config: ModelConfig) -> GoogleAdapter {
        let mut adapter = GoogleAdapter::new(config, google_extractor).unwrap();
        adapter.core = adapter.core.with_retry(fast_retry(1));
        adapter
    }

    fn candidate(text: &str) -> Value {
        json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"text": "SECRET musing", "thought": true},
                {"text": text}
            ]}}],
            "usageMetadata": {"promptTokenCount": 20, "candidatesTokenCount": 5, "totalTokenCount": 25},
            "modelVersion": "gemini-2.5-flash"
        })
    }

    const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    #[tokio::test]
    async fn test_header_auth_and_nested_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate("Snowy peaks at dawn.")))
            .expect(1)
            .mount(&server)
            .await;

        let response = adapter_for(config(&server.uri()))
            .analyze_with_response(&data_image(), "Describe")
            .await
            .unwrap();
        assert_eq!(response.content, "Snowy peaks at dawn.");
        assert_eq!(response.usage.unwrap().total_tokens, 25);

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(
            parts[0],
            json!({"inline_data": {"mime_type": "image/png", "data": "AAAA"}})
        );
        assert_eq!(parts[1], json!({"text": "Describe"}));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
        assert!(body["generationConfig"].get("thinkingConfig").is_none());
    }

    #[tokio::test]
    async fn test_bearer_auth_flat_part_and_thinking() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/models/gemini-2.5-flash:generateContent"))
            .and(header("authorization", format!("Bearer {KEY}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate("A quiet harbor.")))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = config(&server.uri());
        config.google.api_version = "v1".to_string();
        config.google.auth = GoogleAuth::Bearer;
        config.google.image_part = ImagePartEncoding::Flat;
        config.thinking_enabled = true;

        let text = adapter_for(config).analyze(&data_image(), "Describe").await.unwrap();
        assert_eq!(text, "A quiet harbor.");

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(
            body["contents"][0]["parts"][0],
            json!({"mime_type": "image/png", "data": "AAAA"})
        );
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 1024);
    }

    #[tokio::test]
    async fn test_url_image_downloaded_and_inlined() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photos/cat.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "image/png"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate("A cat in a box.")))
            .mount(&server)
            .await;

        let image = url_image(&format!("{}/photos/cat.png", server.uri()));
        let text = adapter_for(config(&server.uri())).analyze(&image, "Describe").await.unwrap();
        assert_eq!(text, "A cat in a box.");

        let requests = server.received_requests().await.unwrap();
        let post = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
        let body: Value = serde_json::from_slice(&post.body).unwrap();
        assert_eq!(
            body["contents"][0]["parts"][0]["inline_data"],
            json!({"mime_type": "image/png", "data": "AQID"})
        );
    }

    #[tokio::test]
    async fn test_download_of_unsupported_type_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("GIF89a", "image/gif"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate("unused")))
            .expect(0)
            .mount(&server)
            .await;

        let image = url_image(&format!("{}/anim.png", server.uri()));
        let err = adapter_for(config(&server.uri()))
            .analyze(&image, "Describe")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_query_key_masked_in_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("key", KEY))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend unavailable"))
            .expect(2)
            .mount(&server)
            .await;

        let mut config = config(&server.uri());
        config.google.auth = GoogleAuth::Query;

        let err = adapter_for(config)
            .analyze(&data_image(), "Describe")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));

        let envelope = serde_json::to_string(&err.to_envelope(false)).unwrap();
        assert!(envelope.contains("key=***"), "{envelope}");
        assert!(!envelope.contains(KEY));
    }
}
