//! Image input classification and normalization.
//!
//! Raw image strings arrive as one of three shapes:
//!
//! ```text
//! data:image/png;base64,AAAA  → Base64  (passed through after validation)
//! https://host/cat.webp       → Url     (validated, never fetched here)
//! ./photos/cat.jpg            → Local   (read and re-encoded as a data URL)
//! ```
//!
//! Whatever the shape, the canonical form handed to adapters always refers to
//! one of the four supported MIME types.

pub(crate) mod download;
mod magic;

use base64::Engine;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::ImageConfig;
use crate::error::{ImageLoadReason, Result, VisionError};

/// MIME types accepted anywhere in the system. `image/jpg` is a common alias.
pub const SUPPORTED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// File extensions accepted for local files and URL paths.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Image extensions that are recognizably unsupported even when URL
/// validation is relaxed.
const UNSUPPORTED_IMAGE_EXTENSIONS: [&str; 9] =
    ["gif", "bmp", "tif", "tiff", "svg", "heic", "heif", "avif", "ico"];

/// How the raw input was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageInputKind {
    Url,
    Base64,
    Local,
}

/// An image input ready to hand to an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImageInput {
    /// Classification of the original input
    pub kind: ImageInputKind,
    /// The input as received (trimmed)
    pub original: String,
    /// URL string or `data:` URL
    pub canonical: String,
    /// Resolved MIME type, one of [`SUPPORTED_MIME_TYPES`]
    pub mime_type: String,
}

impl NormalizedImageInput {
    /// The base64 payload of a data URL, or `None` for URL inputs.
    pub fn base64_data(&self) -> Option<&str> {
        match self.kind {
            ImageInputKind::Url => None,
            ImageInputKind::Base64 | ImageInputKind::Local => self
                .canonical
                .split_once(',')
                .map(|(_, payload)| payload),
        }
    }

    /// MIME type with the `image/jpg` alias folded into `image/jpeg`, for
    /// vendors that only accept the registered name.
    pub fn media_type(&self) -> &str {
        if self.mime_type == "image/jpg" {
            "image/jpeg"
        } else {
            &self.mime_type
        }
    }

    /// Size in bytes of the canonical representation sent upstream.
    pub fn encoded_size(&self) -> usize {
        self.canonical.len()
    }
}

/// Classify a raw input string. Data URLs win over URLs; everything else is
/// treated as a local path.
pub fn classify(raw: &str) -> ImageInputKind {
    if raw.starts_with("data:image/") && raw.contains(";base64,") {
        ImageInputKind::Base64
    } else if raw.starts_with("http://") || raw.starts_with("https://") {
        ImageInputKind::Url
    } else {
        ImageInputKind::Local
    }
}

/// Map a file extension (case-insensitive, without the dot) to its MIME type.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

pub(crate) fn is_supported_mime(mime: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&mime)
}

fn unsupported_format(what: &str) -> VisionError {
    VisionError::invalid_input(format!(
        "Unsupported image format {what}. Supported formats: {}",
        SUPPORTED_EXTENSIONS.join(", ")
    ))
    .with_detail("supported_mime_types", SUPPORTED_MIME_TYPES.to_vec())
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Turns raw image strings into [`NormalizedImageInput`]s.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    strict_url_validation: bool,
    max_file_size: u64,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::from_config(&ImageConfig::default())
    }
}

impl ImageNormalizer {
    pub fn new(strict_url_validation: bool, max_file_size: u64) -> Self {
        Self {
            strict_url_validation,
            max_file_size,
        }
    }

    pub fn from_config(config: &ImageConfig) -> Self {
        Self::new(config.strict_url_validation, config.max_file_size_bytes())
    }

    /// Classify and canonicalize a raw image input.
    pub async fn normalize(&self, raw: &str) -> Result<NormalizedImageInput> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(VisionError::invalid_input("Image input is empty"));
        }

        match classify(raw) {
            ImageInputKind::Base64 => normalize_data_url(raw),
            ImageInputKind::Url => self.normalize_url(raw),
            ImageInputKind::Local => self.normalize_local(raw).await,
        }
    }

    fn normalize_url(&self, raw: &str) -> Result<NormalizedImageInput> {
        let parsed = url::Url::parse(raw)
            .map_err(|e| VisionError::invalid_input(format!("Invalid image URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(VisionError::invalid_input(
                "Image URL must be an absolute http(s) URL",
            ));
        }

        let extension = extension_of(Path::new(parsed.path()));
        let mime_type = match extension.as_deref().and_then(mime_for_extension) {
            Some(mime) => mime,
            None => {
                let is_known_unsupported = extension
                    .as_deref()
                    .is_some_and(|e| UNSUPPORTED_IMAGE_EXTENSIONS.contains(&e));
                if self.strict_url_validation || is_known_unsupported {
                    return Err(unsupported_format(&format!(
                        "in URL path '{}'",
                        parsed.path()
                    ))
                    .with_detail("url", raw));
                }
                tracing::warn!(
                    url = %crate::sanitize::sanitize_text(raw),
                    "Image URL has no recognized extension; assuming image/jpeg"
                );
                "image/jpeg"
            }
        };

        Ok(NormalizedImageInput {
            kind: ImageInputKind::Url,
            original: raw.to_string(),
            canonical: raw.to_string(),
            mime_type: mime_type.to_string(),
        })
    }

    async fn normalize_local(&self, raw: &str) -> Result<NormalizedImageInput> {
        let path = PathBuf::from(shellexpand::tilde(raw).into_owned());
        let mime_type = extension_of(&path)
            .as_deref()
            .and_then(mime_for_extension)
            .ok_or_else(|| {
                unsupported_format(&format!("for file '{}'", path.display()))
                    .with_detail("path", path.display().to_string())
            })?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        if metadata.is_dir() {
            return Err(VisionError::image_load(
                ImageLoadReason::Io,
                format!("{} is a directory", path.display()),
            ));
        }
        if metadata.len() > self.max_file_size {
            return Err(VisionError::image_load(
                ImageLoadReason::TooLarge,
                format!(
                    "{} is {} bytes (limit {} bytes)",
                    path.display(),
                    metadata.len(),
                    self.max_file_size
                ),
            ));
        }

        let bytes = tokio::fs::read(&path).await.map_err(|e| io_error(&path, e))?;
        if bytes.is_empty() {
            return Err(VisionError::image_load(
                ImageLoadReason::Empty,
                format!("{} is empty", path.display()),
            ));
        }

        if let Some(sniffed) = magic::sniff_mime(&bytes) {
            if sniffed != mime_type {
                tracing::warn!(
                    path = %path.display(),
                    extension_mime = mime_type,
                    content_mime = sniffed,
                    "Image content does not match its file extension"
                );
            }
        }

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Loaded local image");
        let data = base64::engine::general_purpose::STANDARD.encode(&bytes);

        Ok(NormalizedImageInput {
            kind: ImageInputKind::Local,
            original: raw.to_string(),
            canonical: format!("data:{mime_type};base64,{data}"),
            mime_type: mime_type.to_string(),
        })
    }
}

fn normalize_data_url(raw: &str) -> Result<NormalizedImageInput> {
    let (prefix, payload) = raw
        .split_once(',')
        .ok_or_else(|| VisionError::invalid_input("Malformed data URL: missing ','"))?;

    let mime_type = prefix
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();
    if !is_supported_mime(&mime_type) {
        return Err(unsupported_format(&format!("'{mime_type}'")));
    }

    if payload.trim().is_empty() {
        return Err(VisionError::invalid_input("Data URL has an empty base64 payload"));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| VisionError::invalid_input(format!("Data URL payload is not valid base64: {e}")))?;

    Ok(NormalizedImageInput {
        kind: ImageInputKind::Base64,
        original: raw.to_string(),
        canonical: raw.to_string(),
        mime_type,
    })
}

fn io_error(path: &Path, error: std::io::Error) -> VisionError {
    let reason = match error.kind() {
        std::io::ErrorKind::NotFound => ImageLoadReason::NotFound,
        std::io::ErrorKind::PermissionDenied => ImageLoadReason::PermissionDenied,
        _ => ImageLoadReason::Io,
    };
    VisionError::image_load(reason, format!("{}: {error}", path.display()))
        .with_detail("path", path.display().to_string())
}
