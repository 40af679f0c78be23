//! Vendor-agnostic stripping of textual thinking markers.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use super::ModelResponseEnvelope;

/// Content shorter than this after stripping is dropped entirely when the
/// vendor also sent an explicit reasoning field.
pub const FAIL_CLOSED_MIN_CHARS: usize = 10;

/// Upper bound on strip passes. Each pass removes at least one marker, so
/// only pathologically nested input reaches it.
const MAX_FILTER_PASSES: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("thinking markers still present after {0} passes")]
    NotConverged(usize),
}

/// Applied in order on every pass.
static THINKING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // <think>...</think>, <thinking>...</thinking>, <reasoning>, <reflection>
        r"(?is)<(?:think|thinking|reasoning|reflection)(?:\s[^>]*)?>.*?</(?:think|thinking|reasoning|reflection)\s*>",
        // closing tag whose opening tag was never emitted
        r"(?is)\A.*</(?:think|thinking|reasoning|reflection)\s*>",
        // opening tag that was never closed (truncated output)
        r"(?is)<(?:think|thinking|reasoning|reflection)(?:\s[^>]*)?>.*\z",
        // ```thinking ... ``` fenced blocks
        r"(?is)```[ \t]*(?:thinking|reasoning|thoughts?)\b.*?```",
        // fence that was never closed
        r"(?is)```[ \t]*(?:thinking|reasoning|thoughts?)\b.*\z",
        // [THINKING] ... [/THINKING]
        r"(?is)\[(?:thinking|reasoning|thoughts?)\].*?\[/(?:thinking|reasoning|thoughts?)\]",
        // [THINKING] that was never closed
        r"(?is)\[(?:thinking|reasoning|thoughts?)\].*\z",
        // Reasoning: / Analysis: / Thinking: labeled lines
        r"(?im)^[ \t]*(?:\*\*)?(?:reasoning|analysis|thinking|thought process)(?:\*\*)?[ \t]*:(?:\*\*)?[^\n]*\n?",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static EXCESS_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

fn any_marker(text: &str) -> bool {
    THINKING_PATTERNS.iter().any(|p| p.is_match(text))
}

fn tidy(text: &str) -> String {
    EXCESS_BLANK_LINES
        .replace_all(text, "\n\n")
        .trim()
        .to_string()
}

/// Remove all thinking markers from `content`, repeating until none match so
/// that repeated and nested markers are handled.
///
/// Content without any marker is returned byte-for-byte; whitespace is only
/// tidied after something was removed.
pub fn strip_thinking_markers(content: &str) -> Result<String, FilterError> {
    if !any_marker(content) {
        return Ok(content.to_string());
    }
    let mut text = content.to_string();
    for _ in 0..MAX_FILTER_PASSES {
        if !any_marker(&text) {
            return Ok(tidy(&text));
        }
        for pattern in THINKING_PATTERNS.iter() {
            text = pattern.replace_all(&text, "").into_owned();
        }
    }
    if any_marker(&text) {
        Err(FilterError::NotConverged(MAX_FILTER_PASSES))
    } else {
        Ok(tidy(&text))
    }
}

/// Produce the caller-safe content of an envelope.
///
/// Explicit reasoning/thinking fields are never returned; only their sizes
/// are logged. Returns `Ok(None)` when the envelope had no content field.
pub fn filter_envelope(envelope: &ModelResponseEnvelope) -> Result<Option<String>, FilterError> {
    let Some(content) = envelope.content.as_deref() else {
        return Ok(None);
    };

    let explicit = envelope.has_explicit_reasoning();
    if explicit {
        tracing::debug!(
            reasoning_chars = envelope.reasoning.as_deref().map_or(0, str::len),
            thinking_chars = envelope.thinking.as_deref().map_or(0, str::len),
            "Discarding explicit reasoning from model response"
        );
    }

    let stripped = strip_thinking_markers(content)?;
    if explicit && stripped.chars().count() < FAIL_CLOSED_MIN_CHARS {
        tracing::warn!(
            remaining_chars = stripped.chars().count(),
            "Visible content too short after removing reasoning; returning empty content"
        );
        return Ok(Some(String::new()));
    }
    Ok(Some(stripped))
}
