//! Bounded image download for vendors that cannot take bare URLs.

use base64::Engine;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use super::{is_supported_mime, SUPPORTED_MIME_TYPES};
use crate::error::{ImageLoadReason, Result, VisionError};

/// Largest image we are willing to pull into memory.
pub const MAX_DOWNLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Fixed deadline for the whole download, independent of the model timeout.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// A remote image re-encoded for inline delivery.
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    pub mime_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

/// Download `url` with the default size limit and deadline.
pub async fn fetch_inline(client: &reqwest::Client, url: &str) -> Result<DownloadedImage> {
    fetch_inline_with_limits(client, url, MAX_DOWNLOAD_BYTES, DOWNLOAD_TIMEOUT).await
}

pub async fn fetch_inline_with_limits(
    client: &reqwest::Client,
    url: &str,
    max_bytes: u64,
    deadline: Duration,
) -> Result<DownloadedImage> {
    match tokio::time::timeout(deadline, download(client, url, max_bytes)).await {
        Ok(result) => result,
        Err(_) => Err(VisionError::image_load(
            ImageLoadReason::Download,
            format!("Image download exceeded the {}ms deadline", deadline.as_millis()),
        )
        .with_detail("url", url)),
    }
}

async fn download(client: &reqwest::Client, url: &str, max_bytes: u64) -> Result<DownloadedImage> {
    let response = client.get(url).send().await.map_err(|e| {
        VisionError::image_load(
            ImageLoadReason::Download,
            format!("Failed to download image: {}", e.without_url()),
        )
        .with_detail("url", url)
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(VisionError::image_load(
            ImageLoadReason::Download,
            format!("Image download returned HTTP {status}"),
        )
        .with_detail("url", url)
        .with_detail("status_code", status.as_u16()));
    }

    let mime_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();
    if !is_supported_mime(&mime_type) {
        return Err(VisionError::invalid_input(format!(
            "Downloaded image has unsupported content type '{mime_type}'. Supported: {}",
            SUPPORTED_MIME_TYPES.join(", ")
        ))
        .with_detail("url", url));
    }

    if let Some(length) = response.content_length() {
        if length > max_bytes {
            return Err(too_large(url, length, max_bytes));
        }
    }

    let mut bytes: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            VisionError::image_load(
                ImageLoadReason::Download,
                format!("Image download interrupted: {}", e.without_url()),
            )
        })?;
        let total = (bytes.len() + chunk.len()) as u64;
        if total > max_bytes {
            return Err(too_large(url, total, max_bytes));
        }
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        return Err(VisionError::image_load(
            ImageLoadReason::Empty,
            "Downloaded image is empty",
        )
        .with_detail("url", url));
    }

    tracing::debug!(bytes = bytes.len(), mime_type = %mime_type, "Downloaded remote image");
    let mime_type = if mime_type == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        mime_type
    };
    Ok(DownloadedImage {
        mime_type,
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
    })
}

fn too_large(url: &str, size: u64, max_bytes: u64) -> VisionError {
    VisionError::image_load(
        ImageLoadReason::TooLarge,
        format!("Remote image is larger than {max_bytes} bytes"),
    )
    .with_detail("url", url)
    .with_detail("size_bytes", size)
}
