//! Per-vendor payload extractors.

use serde_json::Value;

use super::{ModelResponseEnvelope, ThinkingExtractor, TokenUsage};

/// Pick the extractor for a provider id. Unknown ids get the
/// OpenAI-compatible extractor, the most common wire shape.
pub fn extractor_for(provider: &str) -> ThinkingExtractor {
    match provider {
        "anthropic" => anthropic_extractor,
        "google" | "gemini" => google_extractor,
        _ => openai_compatible_extractor,
    }
}

fn as_u32(value: Option<&Value>) -> u32 {
    value
        .and_then(Value::as_u64)
        .map(|n| n.min(u32::MAX as u64) as u32)
        .unwrap_or(0)
}

fn non_empty(parts: Vec<String>) -> Option<String> {
    (!parts.is_empty()).then(|| parts.join("\n"))
}

/// `choices[0].message` with `content` as a string or an array of parts,
/// and reasoning under `reasoning_content` or `reasoning`.
pub fn openai_compatible_extractor(payload: &Value) -> ModelResponseEnvelope {
    let message = payload.pointer("/choices/0/message");

    let mut thinking_parts = Vec::new();
    let content = match message.and_then(|m| m.get("content")) {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Array(parts)) => {
            let mut texts = Vec::new();
            for part in parts {
                let text = part.get("text").and_then(Value::as_str).unwrap_or_default();
                match part.get("type").and_then(Value::as_str) {
                    Some("thinking") | Some("reasoning") => thinking_parts.push(text.to_string()),
                    _ => texts.push(text.to_string()),
                }
            }
            Some(texts.join(""))
        }
        _ => None,
    };

    let reasoning = message
        .and_then(|m| m.get("reasoning_content").or_else(|| m.get("reasoning")))
        .and_then(Value::as_str)
        .map(str::to_string);

    let usage = payload.get("usage").map(|u| {
        let prompt_tokens = as_u32(u.get("prompt_tokens"));
        let completion_tokens = as_u32(u.get("completion_tokens"));
        let total = as_u32(u.get("total_tokens"));
        TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: if total > 0 {
                total
            } else {
                prompt_tokens + completion_tokens
            },
        }
    });

    ModelResponseEnvelope {
        content,
        reasoning,
        thinking: non_empty(thinking_parts),
        usage,
        model: payload.get("model").and_then(Value::as_str).map(str::to_string),
    }
}

/// Anthropic Messages API: `content[]` of typed blocks. `thinking` and
/// `redacted_thinking` blocks are reasoning; `text` blocks are the answer.
pub fn anthropic_extractor(payload: &Value) -> ModelResponseEnvelope {
    let mut texts = Vec::new();
    let mut thinking = Vec::new();
    let blocks = payload.get("content").and_then(Value::as_array);

    for block in blocks.into_iter().flatten() {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    texts.push(text.to_string());
                }
            }
            Some("thinking") => {
                if let Some(text) = block.get("thinking").and_then(Value::as_str) {
                    thinking.push(text.to_string());
                }
            }
            Some("redacted_thinking") => thinking.push("[redacted]".to_string()),
            _ => {}
        }
    }

    let usage = payload.get("usage").map(|u| {
        let prompt_tokens = as_u32(u.get("input_tokens"));
        let completion_tokens = as_u32(u.get("output_tokens"));
        TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    });

    ModelResponseEnvelope {
        content: blocks.map(|_| texts.join("")),
        reasoning: None,
        thinking: non_empty(thinking),
        usage,
        model: payload.get("model").and_then(Value::as_str).map(str::to_string),
    }
}

/// Google generateContent: `candidates[0].content.parts[]`, where parts
/// flagged `thought: true` carry the model's thinking.
pub fn google_extractor(payload: &Value) -> ModelResponseEnvelope {
    let parts = payload
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array);

    let mut texts = Vec::new();
    let mut thoughts = Vec::new();
    for part in parts.into_iter().flatten() {
        let Some(text) = part.get("text").and_then(Value::as_str) else {
            continue;
        };
        if part.get("thought").and_then(Value::as_bool).unwrap_or(false) {
            thoughts.push(text.to_string());
        } else {
            texts.push(text.to_string());
        }
    }

    let usage = payload.get("usageMetadata").map(|u| {
        let prompt_tokens = as_u32(u.get("promptTokenCount"));
        let completion_tokens = as_u32(u.get("candidatesTokenCount"));
        let total = as_u32(u.get("totalTokenCount"));
        TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: if total > 0 {
                total
            } else {
                prompt_tokens + completion_tokens
            },
        }
    });

    ModelResponseEnvelope {
        content: parts.map(|_| texts.join("")),
        reasoning: None,
        thinking: non_empty(thoughts),
        usage,
        model: payload
            .get("modelVersion")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}
