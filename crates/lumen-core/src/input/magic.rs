//! Content sniffing from image magic bytes.
//!
//! Only used to warn when a file's content disagrees with its extension; the
//! MIME type sent upstream is always derived from the extension.

/// Detect the MIME type of an image from its leading bytes.
pub(crate) fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }

    // JPEG: FF D8 FF
    if bytes[0] == 0xFF && bytes[1] == 0xD8 && bytes[2] == 0xFF {
        return Some("image/jpeg");
    }

    // PNG: 89 50 4E 47
    if bytes[0] == 0x89 && bytes[1] == b'P' && bytes[2] == b'N' && bytes[3] == b'G' {
        return Some("image/png");
    }

    // WebP: RIFF....WEBP
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    // GIF: GIF8
    if &bytes[0..4] == b"GIF8" {
        return Some("image/gif");
    }

    // BMP: BM
    if bytes[0] == b'B' && bytes[1] == b'M' {
        return Some("image/bmp");
    }

    None
}
