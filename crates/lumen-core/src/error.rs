//! Error types for image analysis.
//!
//! Every failure is a [`VisionError`] variant tagged with an [`ErrorKind`].
//! Errors carry a detail map that is sanitized before it leaves the process:
//! [`VisionError::to_envelope`] produces the serializable [`ErrorEnvelope`]
//! returned to callers, with credentials masked and the source chain attached
//! only at debug verbosity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::sanitize::{sanitize_text, sanitize_value};

/// Free-form structured context attached to an error.
pub type Details = Map<String, Value>;

/// Coarse classification of a failure, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    ModelConfig,
    ImageLoad,
    ApiError,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::ModelConfig => "model_config",
            Self::ImageLoad => "image_load",
            Self::ApiError => "api_error",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a local (or downloaded) image could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageLoadReason {
    NotFound,
    PermissionDenied,
    Empty,
    TooLarge,
    Io,
    Download,
}

impl ImageLoadReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::Empty => "empty",
            Self::TooLarge => "too_large",
            Self::Io => "io",
            Self::Download => "download",
        }
    }
}

impl fmt::Display for ImageLoadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for lumen operations.
#[derive(Error, Debug)]
pub enum VisionError {
    /// Malformed client input. Never retried.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String, details: Details },

    /// Startup misconfiguration. Fatal.
    #[error("Model configuration error: {message}")]
    ModelConfig { message: String, details: Details },

    /// Local I/O or download failure while loading the image. Never retried.
    #[error("Failed to load image ({reason}): {message}")]
    ImageLoad {
        reason: ImageLoadReason,
        message: String,
        details: Details,
    },

    /// The vendor API failed or returned something unusable.
    #[error("{provider} API error: {message}")]
    Api {
        provider: String,
        message: String,
        status_code: Option<u16>,
        retry_after_secs: Option<u64>,
        details: Details,
    },

    /// A single attempt exceeded its deadline.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64, details: Details },

    /// Anything else. Keeps the original error as its source.
    #[error("Unexpected error: {message}")]
    Unknown {
        message: String,
        details: Details,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl VisionError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            details: Details::new(),
        }
    }

    pub fn model_config(message: impl Into<String>) -> Self {
        Self::ModelConfig {
            message: message.into(),
            details: Details::new(),
        }
    }

    pub fn image_load(reason: ImageLoadReason, message: impl Into<String>) -> Self {
        Self::ImageLoad {
            reason,
            message: message.into(),
            details: Details::new(),
        }
    }

    pub fn api(provider: &str, message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Api {
            provider: provider.to_string(),
            message: message.into(),
            status_code,
            retry_after_secs: None,
            details: Details::new(),
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout {
            timeout_ms,
            details: Details::new(),
        }
    }

    /// Wrap an arbitrary error, keeping it reachable through `source()`.
    pub fn unknown<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unknown {
            message: error.to_string(),
            details: Details::new(),
            source: Some(Box::new(error)),
        }
    }

    /// Attach a detail entry. Values are sanitized when the envelope is built.
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details_mut().insert(key.to_string(), value.into());
        self
    }

    /// Set the vendor retry-after hint on an API error. No-op for other kinds.
    pub fn with_retry_after(mut self, secs: Option<u64>) -> Self {
        if let Self::Api {
            retry_after_secs, ..
        } = &mut self
        {
            *retry_after_secs = secs;
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::ModelConfig { .. } => ErrorKind::ModelConfig,
            Self::ImageLoad { .. } => ErrorKind::ImageLoad,
            Self::Api { .. } => ErrorKind::ApiError,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// HTTP status of an upstream failure, if one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => *status_code,
            _ => None,
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Api {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    pub fn details(&self) -> &Details {
        match self {
            Self::InvalidInput { details, .. }
            | Self::ModelConfig { details, .. }
            | Self::ImageLoad { details, .. }
            | Self::Api { details, .. }
            | Self::Timeout { details, .. }
            | Self::Unknown { details, .. } => details,
        }
    }

    fn details_mut(&mut self) -> &mut Details {
        match self {
            Self::InvalidInput { details, .. }
            | Self::ModelConfig { details, .. }
            | Self::ImageLoad { details, .. }
            | Self::Api { details, .. }
            | Self::Timeout { details, .. }
            | Self::Unknown { details, .. } => details,
        }
    }

    /// The human message without the kind prefix added by `Display`.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput { message, .. }
            | Self::ModelConfig { message, .. }
            | Self::ImageLoad { message, .. }
            | Self::Api { message, .. }
            | Self::Unknown { message, .. } => message.clone(),
            Self::Timeout { timeout_ms, .. } => format!("Request timed out after {timeout_ms}ms"),
        }
    }

    /// Full detail map including the variant's structured fields, unsanitized.
    pub(crate) fn collected_details(&self) -> Details {
        let mut details = self.details().clone();
        match self {
            Self::ImageLoad { reason, .. } => {
                details.insert("reason".into(), Value::from(reason.as_str()));
            }
            Self::Api {
                provider,
                status_code,
                retry_after_secs,
                ..
            } => {
                details.insert("provider".into(), Value::from(provider.as_str()));
                if let Some(code) = status_code {
                    details.insert("status_code".into(), Value::from(*code));
                }
                if let Some(secs) = retry_after_secs {
                    details.insert("retry_after_secs".into(), Value::from(*secs));
                }
            }
            Self::Timeout { timeout_ms, .. } => {
                details.insert("timeout_ms".into(), Value::from(*timeout_ms));
            }
            _ => {}
        }
        details
    }

    /// Convert into the sanitized, serializable form handed to callers.
    ///
    /// With `debug` set, the chain of source errors is included under
    /// `details.cause_chain`.
    pub fn to_envelope(&self, debug: bool) -> ErrorEnvelope {
        let mut details = self.collected_details();
        if debug {
            let chain = source_chain(self);
            if !chain.is_empty() {
                details.insert(
                    "cause_chain".into(),
                    Value::Array(chain.into_iter().map(Value::from).collect()),
                );
            }
        }

        ErrorEnvelope {
            message: sanitize_text(&self.message()),
            kind: self.kind(),
            details: sanitize_value(Value::Object(details)),
            timestamp: Utc::now(),
        }
    }
}

fn source_chain(error: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = error.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    chain
}

/// Configuration-file and environment errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for VisionError {
    fn from(error: ConfigError) -> Self {
        VisionError::model_config(error.to_string())
    }
}

/// Serialized error returned across the outer boundary.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub message: String,
    pub kind: ErrorKind,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

/// Convenience type alias for lumen results.
pub type Result<T> = std::result::Result<T, VisionError>;
