//! Document format detection.
//!
//! Formats are resolved from the declared MIME type first, then from magic
//! bytes, then from the file extension.

use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Plan document formats understood by the built-in decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Text,
    Csv,
    Json,
}

impl DocumentFormat {
    /// Canonical MIME type for the format.
    pub fn mime(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Text => "text/plain",
            DocumentFormat::Csv => "text/csv",
            DocumentFormat::Json => "application/json",
        }
    }

    /// Map a MIME type (parameters ignored) to a format.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" | "application/x-pdf" => Some(DocumentFormat::Pdf),
            "text/plain" => Some(DocumentFormat::Text),
            "text/csv" | "application/csv" => Some(DocumentFormat::Csv),
            "application/json" | "text/json" => Some(DocumentFormat::Json),
            _ => None,
        }
    }

    /// Map a file extension (without dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" | "text" => Some(DocumentFormat::Text),
            "csv" => Some(DocumentFormat::Csv),
            "json" => Some(DocumentFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Detect the format of a document.
///
/// A declared MIME type that names a known format wins. An unknown declared
/// type is an error only if sniffing also fails.
pub fn detect_format(data: &[u8], declared_mime: Option<&str>, name: &str) -> Result<DocumentFormat> {
    if let Some(format) = declared_mime.and_then(DocumentFormat::from_mime) {
        return Ok(format);
    }

    if let Some(format) = detect_format_from_bytes(data) {
        if format != DocumentFormat::Text {
            return Ok(format);
        }
        // Text could still be CSV; the extension decides.
        let by_ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(DocumentFormat::from_extension);
        return Ok(match by_ext {
            Some(DocumentFormat::Csv) => DocumentFormat::Csv,
            _ => DocumentFormat::Text,
        });
    }

    match declared_mime {
        Some(mime) => Err(Error::UnsupportedMime(mime.to_string())),
        None => Err(Error::UnknownFormat(name.to_string())),
    }
}

/// Sniff the format from leading bytes.
pub fn detect_format_from_bytes(data: &[u8]) -> Option<DocumentFormat> {
    if is_pdf_bytes(data) {
        return Some(DocumentFormat::Pdf);
    }

    let body = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let text = std::str::from_utf8(body).ok()?;
    match text.trim_start().chars().next() {
        Some('{') | Some('[') => Some(DocumentFormat::Json),
        Some(_) => Some(DocumentFormat::Text),
        None => None,
    }
}

/// Check if bytes start with the PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    data.starts_with(PDF_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_mime_wins() {
        let format = detect_format(b"Mark,Qty\nW1,4", Some("text/csv; charset=utf-8"), "x").unwrap();
        assert_eq!(format, DocumentFormat::Csv);
    }

    #[test]
    fn test_sniff_pdf() {
        assert_eq!(
            detect_format(b"%PDF-1.7\n...", None, "plans").unwrap(),
            DocumentFormat::Pdf
        );
    }

    #[test]
    fn test_sniff_json_and_text() {
        assert_eq!(
            detect_format(b"  {\"pages\": []}", None, "pages").unwrap(),
            DocumentFormat::Json
        );
        assert_eq!(
            detect_format(b"WINDOW SCHEDULE", None, "notes").unwrap(),
            DocumentFormat::Text
        );
    }

    #[test]
    fn test_csv_by_extension() {
        assert_eq!(
            detect_format(b"Mark,Qty\nW1,4", None, "schedule.CSV").unwrap(),
            DocumentFormat::Csv
        );
    }

    #[test]
    fn test_binary_unknown() {
        let err = detect_format(&[0xFF, 0xD8, 0xFF, 0xE0], None, "photo.jpg").unwrap_err();
        assert!(matches!(err, Error::UnknownFormat(_)));

        let err = detect_format(&[0xFF, 0xD8], Some("image/jpeg"), "photo.jpg").unwrap_err();
        assert!(matches!(err, Error::UnsupportedMime(_)));
    }

    #[test]
    fn test_empty_is_unknown() {
        assert!(detect_format_from_bytes(b"").is_none());
        assert!(detect_format_from_bytes(b"   ").is_none());
    }
}
