//! Content sniffing: MIME type from magic bytes, never from the URL.
//!
//! Detection looks only at the leading bytes of the body. The MIME type is
//! then mapped through a fixed table with exactly one extension per type, so
//! the same content always lands under the same file name.

use thiserror::Error;

/// Fallback MIME type when nothing matches. Never mapped to an extension.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// How many leading bytes the text heuristics inspect.
const TEXT_PREVIEW: usize = 512;

/// Canonical MIME → extension table. Order is significant: it is also the
/// search order used when looking for a previously downloaded file.
pub const EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/bmp", "bmp"),
    ("image/webp", "webp"),
    ("image/tiff", "tiff"),
    ("image/x-icon", "ico"),
    ("image/svg+xml", "svg"),
    ("application/pdf", "pdf"),
    ("text/html", "html"),
    ("application/xml", "xml"),
    ("text/plain", "txt"),
];

/// Alternate spellings of MIME types in `EXTENSIONS`. Legacy subtypes that
/// are not listed here (e.g. `image/pjpeg`) stay unmapped.
const ALIASES: &[(&str, &str)] = &[
    ("image/vnd.microsoft.icon", "image/x-icon"),
    ("image/x-ms-bmp", "image/bmp"),
    ("text/xml", "application/xml"),
];

/// The sniffed type of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub mime: &'static str,
    pub ext: &'static str,
}

/// Content whose MIME type has no extension in the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bad content type '{mime}'")]
pub struct UnknownContent {
    pub mime: &'static str,
}

/// Sniff the body and map it to a file extension.
pub fn classify(data: &[u8]) -> Result<Classified, UnknownContent> {
    let mime = sniff_mime(data);
    match extension_for_mime(mime) {
        Some(ext) => Ok(Classified { mime, ext }),
        None => Err(UnknownContent { mime }),
    }
}

/// Canonical extension (without dot) for a MIME type, if any.
///
/// Parameters (`; charset=...`) and case are ignored.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == essence)
        .map(|(_, target)| *target)
        .unwrap_or(essence.as_str());
    EXTENSIONS
        .iter()
        .find(|(m, _)| *m == canonical)
        .map(|(_, ext)| *ext)
}

/// Detect a MIME type from the leading bytes of `data`.
pub fn sniff_mime(data: &[u8]) -> &'static str {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png";
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return "image/gif";
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return "image/webp";
    }
    if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        return "image/tiff";
    }
    // BITMAPFILEHEADER is 14 bytes; shorter "BM" bodies are just text.
    if data.len() >= 14 && data.starts_with(b"BM") {
        return "image/bmp";
    }
    if data.len() >= 6 && data.starts_with(&[0x00, 0x00, 0x01, 0x00]) && data[4] > 0 {
        return "image/x-icon";
    }
    if data.starts_with(b"%PDF-") {
        return "application/pdf";
    }
    sniff_text(data).unwrap_or(OCTET_STREAM)
}

fn sniff_text(data: &[u8]) -> Option<&'static str> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let preview = &data[..data.len().min(TEXT_PREVIEW)];
    if preview.is_empty() || !looks_like_text(preview) {
        return None;
    }
    let lower = String::from_utf8_lossy(preview).to_lowercase();
    let trimmed = lower.trim_start();
    if trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && trimmed.contains("<svg")) {
        return Some("image/svg+xml");
    }
    if trimmed.starts_with("<!doctype html")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<head")
        || trimmed.starts_with("<body")
    {
        return Some("text/html");
    }
    if trimmed.starts_with("<?xml") {
        return Some("application/xml");
    }
    Some("text/plain")
}

/// No NUL bytes and no control characters besides whitespace.
fn looks_like_text(preview: &[u8]) -> bool {
    preview
        .iter()
        .all(|&b| b == b'\t' || b == b'\n' || b == b'\r' || b == 0x0C || (b >= 0x20 && b != 0x7F))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_image_formats() {
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]), "image/jpeg");
        assert_eq!(sniff_mime(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"), "image/png");
        assert_eq!(sniff_mime(b"GIF89a\x01\0\x01\0"), "image/gif");
        assert_eq!(sniff_mime(b"RIFF\x24\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(b"II*\0\x08\0\0\0"), "image/tiff");
        assert_eq!(sniff_mime(b"BM\x36\0\0\0\0\0\0\0\x36\0\0\0"), "image/bmp");
        assert_eq!(sniff_mime(&[0, 0, 1, 0, 1, 0, 16, 16]), "image/x-icon");
    }

    #[test]
    fn ignores_url_style_hints() {
        // A PNG is a PNG regardless of what name it was served under.
        let c = classify(b"\x89PNG\r\n\x1a\nrest").unwrap();
        assert_eq!(c.ext, "png");
    }

    #[test]
    fn sniffs_text_formats() {
        assert_eq!(sniff_mime(b"<!DOCTYPE html><html></html>"), "text/html");
        assert_eq!(sniff_mime(b"  <html><body>404</body></html>"), "text/html");
        assert_eq!(
            sniff_mime(b"<?xml version=\"1.0\"?><svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
            "image/svg+xml"
        );
        assert_eq!(sniff_mime(b"<?xml version=\"1.0\"?><rss/>"), "application/xml");
        assert_eq!(sniff_mime(b"just words"), "text/plain");
        assert_eq!(sniff_mime(b"%PDF-1.4\n"), "application/pdf");
    }

    #[test]
    fn binary_garbage_is_octet_stream() {
        assert_eq!(sniff_mime(&[0x00, 0x01, 0x02, 0x03, 0xFE]), OCTET_STREAM);
        assert_eq!(sniff_mime(b""), OCTET_STREAM);
        assert_eq!(sniff_mime(b"BM"), "text/plain");
    }

    #[test]
    fn unknown_content_is_skip_signal() {
        let err = classify(&[0x00, 0x13, 0x37]).unwrap_err();
        assert_eq!(err.mime, OCTET_STREAM);
        assert_eq!(err.to_string(), "bad content type 'application/octet-stream'");
    }

    #[test]
    fn jpeg_maps_to_single_canonical_extension() {
        assert_eq!(extension_for_mime("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for_mime("IMAGE/JPEG; charset=binary"), Some("jpg"));
        assert_eq!(extension_for_mime("image/pjpeg"), None);
    }

    #[test]
    fn aliases_resolve_to_canonical_types() {
        assert_eq!(extension_for_mime("image/vnd.microsoft.icon"), Some("ico"));
        assert_eq!(extension_for_mime("image/x-ms-bmp"), Some("bmp"));
        assert_eq!(extension_for_mime("text/xml"), Some("xml"));
        assert_eq!(extension_for_mime(OCTET_STREAM), None);
    }

    #[test]
    fn table_has_one_extension_per_type() {
        for (i, (mime, ext)) in EXTENSIONS.iter().enumerate() {
            assert!(EXTENSIONS[i + 1..].iter().all(|(m, e)| m != mime && e != ext));
            assert!(!matches!(*ext, "jpe" | "jfif" | "jpeg"));
        }
    }
}
