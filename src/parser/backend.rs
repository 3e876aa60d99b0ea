//! PDF backend abstraction layer.
//!
//! Isolates the concrete PDF library (lopdf) from span extraction, so the
//! layout code only sees content operations and decoded strings.

use std::collections::BTreeMap;

use crate::error::Result;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

impl PdfValue {
    /// Numeric value of an integer or real operand.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            PdfValue::Integer(i) => Some(*i as f32),
            PdfValue::Real(r) => Some(*r),
            _ => None,
        }
    }
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    pub fn new(operator: impl Into<String>, operands: Vec<PdfValue>) -> Self {
        Self {
            operator: operator.into(),
            operands,
        }
    }

    /// Numeric operand at `index`, or `default`.
    pub fn number(&self, index: usize, default: f32) -> f32 {
        self.operands
            .get(index)
            .and_then(PdfValue::as_number)
            .unwrap_or(default)
    }
}

/// Abstract interface for PDF document access.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return the decoded content operations of a page.
    fn page_operations(&self, page: PageId) -> Result<Vec<ContentOp>>;

    /// Decode a text byte sequence using the font's encoding on the given page.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;

    /// Plain text of a page when its content stream yields no positioned spans.
    fn fallback_text(&self, page_number: u32) -> Option<String>;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(feature = "pdf")]
pub use lopdf_backend::LopdfBackend;

#[cfg(feature = "pdf")]
mod lopdf_backend {
    use std::collections::BTreeMap;

    use lopdf::{Document as LopdfDocument, Object};

    use super::{decode_text_simple, ContentOp, PageId, PdfBackend, PdfValue};
    use crate::error::{Error, Result};

    /// Concrete [`PdfBackend`] backed by `lopdf::Document`.
    pub struct LopdfBackend {
        doc: LopdfDocument,
    }

    impl LopdfBackend {
        /// Load from an in-memory byte slice.
        pub fn load_bytes(data: &[u8]) -> Result<Self> {
            let doc = LopdfDocument::load_mem(data)?;
            if doc.is_encrypted() {
                return Err(Error::PdfParse("document is encrypted".to_string()));
            }
            Ok(Self { doc })
        }

        pub fn page_count(&self) -> usize {
            self.doc.get_pages().len()
        }

        fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
            let page_dict = self
                .doc
                .get_dictionary(page_id)
                .map_err(|e| Error::PdfParse(e.to_string()))?;

            let contents = match page_dict.get(b"Contents") {
                Ok(c) => c,
                // A page without content is blank, not broken.
                Err(_) => return Ok(Vec::new()),
            };

            match contents {
                Object::Reference(r) => match self.doc.get_object(*r) {
                    Ok(Object::Stream(s)) => s
                        .decompressed_content()
                        .or_else(|_| Ok(s.content.clone())),
                    _ => Err(Error::PdfParse("invalid content stream".to_string())),
                },
                Object::Array(arr) => {
                    let mut content = Vec::new();
                    for obj in arr {
                        if let Object::Reference(r) = obj {
                            if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                                if let Ok(data) = s.decompressed_content() {
                                    content.extend_from_slice(&data);
                                    content.push(b' ');
                                }
                            }
                        }
                    }
                    Ok(content)
                }
                _ => Err(Error::PdfParse("invalid content stream".to_string())),
            }
        }
    }

    impl PdfBackend for LopdfBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            self.doc.get_pages()
        }

        fn page_operations(&self, page: PageId) -> Result<Vec<ContentOp>> {
            let data = self.page_content(page)?;
            if data.is_empty() {
                return Ok(Vec::new());
            }
            let content = lopdf::content::Content::decode(&data)
                .map_err(|e| Error::PdfParse(e.to_string()))?;

            Ok(content
                .operations
                .into_iter()
                .map(|op| ContentOp {
                    operator: op.operator,
                    operands: op.operands.iter().map(convert_object).collect(),
                })
                .collect())
        }

        fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
            if let Ok(fonts) = self.doc.get_page_fonts(page) {
                if let Some(font_dict) = fonts.get(font_name) {
                    if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                        if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                            return text;
                        }
                    }
                }
            }
            decode_text_simple(bytes)
        }

        fn fallback_text(&self, page_number: u32) -> Option<String> {
            self.doc
                .extract_text(&[page_number])
                .ok()
                .filter(|t| !t.trim().is_empty())
        }
    }

    fn convert_object(obj: &Object) -> PdfValue {
        match obj {
            Object::Integer(i) => PdfValue::Integer(*i),
            Object::Real(r) => PdfValue::Real(*r),
            Object::Name(n) => PdfValue::Name(n.clone()),
            Object::String(b, _) => PdfValue::Str(b.clone()),
            Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
            _ => PdfValue::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"WINDOW SCHEDULE"), "WINDOW SCHEDULE");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        // 0xB0 = degree sign in Latin-1
        let bytes = vec![0x34, 0x35, 0xB0];
        assert_eq!(decode_text_simple(&bytes), "45°");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x57, 0x00, 0x31];
        assert_eq!(decode_text_simple(&bytes), "W1");
    }

    #[test]
    fn test_content_op_number() {
        let op = ContentOp::new("Td", vec![PdfValue::Integer(72), PdfValue::Real(-14.5)]);
        assert_eq!(op.number(0, 0.0), 72.0);
        assert_eq!(op.number(1, 0.0), -14.5);
        assert_eq!(op.number(2, 9.0), 9.0);
    }
}
