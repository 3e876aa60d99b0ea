//! Page decoders with a plugin registry keyed by MIME type.
//!
//! Every decoder turns one [`SourceDocument`] into a list of [`RawPage`]s:
//! page text plus any tables found on the page. Classification and quantity
//! extraction happen later and do not care which decoder produced a page.
//!
//! # Example
//!
//! ```no_run
//! use planscope::convert::{DecoderRegistry, SourceDocument};
//! use planscope::ExtractOptions;
//!
//! fn main() -> planscope::Result<()> {
//!     let registry = DecoderRegistry::with_defaults();
//!     let doc = SourceDocument::from_path("A-601 schedules.pdf")?;
//!     let decoded = registry.decode(&doc, &ExtractOptions::default())?;
//!     println!("{} pages", decoded.pages.len());
//!     Ok(())
//! }
//! ```

mod csv;
mod json;
#[cfg(feature = "pdf")]
mod pdf;
mod text;

pub use self::csv::CsvDecoder;
pub use self::json::JsonDecoder;
#[cfg(feature = "pdf")]
pub use self::pdf::PdfDecoder;
pub use self::text::TextDecoder;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::detect::detect_format;
use crate::error::{Error, Result};
use crate::model::{PageContext, Table};
use crate::parser::layout::TextSpan;
use crate::parser::table_detector::TableDetector;
use crate::parser::ExtractOptions;

/// A plan document as received from the document source.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    /// Declared MIME type, if the source provided one
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    /// Set the declared MIME type and return self.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Read a document from disk, named by its file name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }
}

/// A table found on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTable {
    pub table: Table,
    /// Index of the page text line holding the table's first row, when known
    pub line: Option<usize>,
}

impl PageTable {
    pub fn new(table: Table, line: Option<usize>) -> Self {
        Self { table, line }
    }
}

/// One decoded page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    /// 1-based page number
    pub number: u32,
    pub text: String,
    pub tables: Vec<PageTable>,
    pub context: PageContext,
}

impl RawPage {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Output of a decoder.
#[derive(Debug, Clone, Default)]
pub struct DecodedDocument {
    pub name: String,
    /// MIME type of the decoder that produced this
    pub mime: String,
    pub pages: Vec<RawPage>,
    /// Pages skipped in lenient mode
    pub warnings: Vec<String>,
}

/// Trait for page decoders.
///
/// Implement this trait to add support for a new document format.
pub trait PageDecoder: Send + Sync {
    /// Get the name of this decoder.
    fn name(&self) -> &str;

    /// MIME types handled by this decoder (lowercase, no parameters).
    fn mime_types(&self) -> &[&str];

    /// Decode a document into pages.
    fn decode(&self, doc: &SourceDocument, options: &ExtractOptions) -> Result<DecodedDocument>;
}

/// Registry for page decoders.
pub struct DecoderRegistry {
    by_mime: HashMap<String, Arc<dyn PageDecoder>>,
    by_name: HashMap<String, Arc<dyn PageDecoder>>,
}

impl DecoderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            by_mime: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with the built-in decoders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        #[cfg(feature = "pdf")]
        registry.register(Arc::new(PdfDecoder::new()));
        registry.register(Arc::new(TextDecoder::new()));
        registry.register(Arc::new(CsvDecoder::new()));
        registry.register(Arc::new(JsonDecoder::new()));
        registry
    }

    /// Register a decoder for all its MIME types. Later registrations win.
    pub fn register(&mut self, decoder: Arc<dyn PageDecoder>) {
        for mime in decoder.mime_types() {
            self.by_mime.insert(mime.to_ascii_lowercase(), decoder.clone());
        }
        self.by_name.insert(decoder.name().to_lowercase(), decoder);
    }

    /// Get a decoder by MIME type.
    pub fn get_by_mime(&self, mime: &str) -> Option<Arc<dyn PageDecoder>> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        self.by_mime.get(&essence).cloned()
    }

    /// Get a decoder by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn PageDecoder>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Check if a MIME type is supported.
    pub fn supports(&self, mime: &str) -> bool {
        self.get_by_mime(mime).is_some()
    }

    /// Decode a document with the decoder for its declared or detected type.
    pub fn decode(&self, doc: &SourceDocument, options: &ExtractOptions) -> Result<DecodedDocument> {
        if let Some(decoder) = doc.mime.as_deref().and_then(|m| self.get_by_mime(m)) {
            return decoder.decode(doc, options);
        }

        let format = detect_format(&doc.bytes, doc.mime.as_deref(), &doc.name)?;
        let decoder = self
            .get_by_mime(format.mime())
            .ok_or_else(|| Error::UnsupportedMime(format.mime().to_string()))?;
        log::debug!("Decoding '{}' with {} decoder", doc.name, decoder.name());
        decoder.decode(doc, options)
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Run the table detector over positioned spans.
///
/// `line_of` maps a table's top baseline to the index of the page text line
/// it starts on.
pub(crate) fn detect_tables(
    spans: Vec<TextSpan>,
    detector: &TableDetector,
    line_of: impl Fn(f32) -> usize,
) -> Vec<PageTable> {
    let (detected, _) = detector.detect(spans);
    detected
        .iter()
        .map(|d| PageTable::new(detector.to_table_model(d), Some(line_of(d.top_y))))
        .collect()
}

/// Decode bytes as UTF-8 text, dropping a leading BOM.
pub(crate) fn decode_utf8(bytes: &[u8]) -> String {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(body).into_owned()
}
