//! System prompt templates and their selection.

use serde::Serialize;
use std::collections::HashSet;

use crate::analyzer::ResponseFormat;
use crate::error::{Result, VisionError};

/// Appended to the composed prompt when JSON output is requested.
const JSON_HINT: &str =
    "Respond with a single valid JSON object only, with no surrounding prose or code fences.";

/// A named system prompt with the keywords that select it.
#[derive(Debug, Clone, Serialize)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    pub system: &'static str,
    #[serde(skip)]
    pub keywords: &'static [&'static str],
}

/// Fallback when nothing more specific matches.
pub const DEFAULT_TEMPLATE: &str = "general";

const BUILTIN_TEMPLATES: &[PromptTemplate] = &[
    PromptTemplate {
        name: "general",
        description: "General-purpose image description",
        system: "You are a precise visual analyst. Describe what the image shows, \
                 focusing on the elements relevant to the request. Be factual and concise.",
        keywords: &[],
    },
    PromptTemplate {
        name: "ocr",
        description: "Text extraction and transcription",
        system: "You are an OCR engine. Transcribe all legible text in the image exactly as \
                 written, preserving line breaks and reading order. Mark illegible parts as [illegible].",
        keywords: &[
            "ocr", "text", "read", "transcribe", "transcription", "words", "document",
            "receipt", "invoice", "handwriting", "extract",
        ],
    },
    PromptTemplate {
        name: "ui",
        description: "User interface and screenshot review",
        system: "You are a UI/UX reviewer. Describe the layout, components, visual hierarchy \
                 and any usability or accessibility problems visible in the interface.",
        keywords: &[
            "ui", "ux", "interface", "screenshot", "button", "layout", "screen", "website",
            "webpage", "app", "mockup", "accessibility",
        ],
    },
    PromptTemplate {
        name: "chart",
        description: "Charts, graphs and data visualizations",
        system: "You are a data analyst. Identify the chart type, axes, units and series, \
                 then summarize the values and trends the visualization shows.",
        keywords: &[
            "chart", "graph", "plot", "diagram", "axis", "axes", "trend", "trends",
            "visualization", "histogram", "bar", "pie",
        ],
    },
    PromptTemplate {
        name: "code",
        description: "Source code in screenshots",
        system: "You are a senior software engineer. Transcribe the code shown in the image, \
                 identify the language, and explain what it does and any bugs you can see.",
        keywords: &[
            "code", "function", "bug", "bugs", "snippet", "syntax", "programming", "compile",
            "stacktrace", "traceback", "debug",
        ],
    },
];

/// The set of available templates.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<PromptTemplate>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateCatalog {
    pub fn builtin() -> Self {
        Self {
            templates: BUILTIN_TEMPLATES.to_vec(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        let name = name.trim();
        self.templates
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn list(&self) -> &[PromptTemplate] {
        &self.templates
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.templates.iter().map(|t| t.name).collect()
    }

    /// Pick the template for a request. An explicit name must exist;
    /// otherwise the template with the most keyword hits in the prompt wins,
    /// ties going to the earlier template, and no hits means the default.
    pub fn select(&self, explicit: Option<&str>, prompt: &str) -> Result<&PromptTemplate> {
        if let Some(name) = explicit.filter(|n| !n.trim().is_empty()) {
            return self.get(name).ok_or_else(|| {
                VisionError::invalid_input(format!(
                    "Unknown template '{name}'. Available: {}",
                    self.names().join(", ")
                ))
                .with_detail("template", name)
            });
        }

        let lowered = prompt.to_lowercase();
        let words: HashSet<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let mut best: Option<(&PromptTemplate, usize)> = None;
        for template in &self.templates {
            let hits = template
                .keywords
                .iter()
                .filter(|k| words.contains(**k))
                .count();
            if hits > 0 && best.map_or(true, |(_, top)| hits > top) {
                best = Some((template, hits));
            }
        }

        match best {
            Some((template, hits)) => {
                tracing::debug!(template = template.name, hits, "Auto-selected template");
                Ok(template)
            }
            None => self
                .get(DEFAULT_TEMPLATE)
                .or_else(|| self.templates.first())
                .ok_or_else(|| VisionError::model_config("Template catalog is empty")),
        }
    }
}

/// System template, then the user's prompt, then the JSON hint if asked for.
pub fn compose_prompt(template: &PromptTemplate, prompt: &str, format: ResponseFormat) -> String {
    let mut composed = format!("{}\n\n{}", template.system, prompt.trim());
    if format == ResponseFormat::Json {
        composed.push_str("\n\n");
        composed.push_str(JSON_HINT);
    }
    composed
}
