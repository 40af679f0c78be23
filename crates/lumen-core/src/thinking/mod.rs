//! Hidden-reasoning removal.
//!
//! Two layers run on every vendor payload before anything is returned:
//!
//! 1. A per-vendor extractor splits the raw JSON into visible content and any
//!    explicit `reasoning` / `thinking` fields ([`ModelResponseEnvelope`]).
//! 2. [`filter_envelope`] discards the explicit fields and strips textual
//!    thinking markers from the content until none remain.
//!
//! If stripping leaves fewer than [`FAIL_CLOSED_MIN_CHARS`] characters while
//! an explicit reasoning field was present, the result is empty rather than
//! anything derived from that field.

mod extract;
mod filter;

pub use extract::{anthropic_extractor, extractor_for, google_extractor, openai_compatible_extractor};
pub use filter::{filter_envelope, strip_thinking_markers, FilterError, FAIL_CLOSED_MIN_CHARS};

use serde::Serialize;
use serde_json::Value;

/// Token accounting reported by the vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Vendor payload split into its parts. Stays inside the adapter layer;
/// only the filtered content ever leaves it.
#[derive(Debug, Clone, Default)]
pub struct ModelResponseEnvelope {
    /// Visible answer text, `None` when the payload had no recognizable
    /// content field
    pub content: Option<String>,
    /// Explicit reasoning field (OpenAI-compatible `reasoning_content`)
    pub reasoning: Option<String>,
    /// Explicit thinking blocks (Anthropic thinking, Google thought parts)
    pub thinking: Option<String>,
    pub usage: Option<TokenUsage>,
    pub model: Option<String>,
}

impl ModelResponseEnvelope {
    /// Whether the vendor sent reasoning outside the content field.
    pub fn has_explicit_reasoning(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.reasoning) || present(&self.thinking)
    }
}

/// Maps a raw vendor payload into a [`ModelResponseEnvelope`].
pub type ThinkingExtractor = fn(&Value) -> ModelResponseEnvelope;
