//! Extraction options and configuration.

use super::table_detector::TableDetectorConfig;

/// Default number of characters kept in a sheet's text excerpt.
pub const DEFAULT_EXCERPT_CHARS: usize = 500;

/// Options for extracting quantities from plan documents.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Whether to decode documents in parallel
    pub parallel: bool,

    /// Characters kept in each sheet's text excerpt
    pub excerpt_chars: usize,

    /// Table detector settings for PDF pages
    pub pdf_tables: TableDetectorConfig,

    /// Table detector settings for plain-text pages
    pub text_tables: TableDetectorConfig,

    /// Share of U+FFFD characters above which a page counts as poor OCR
    pub poor_ocr_ratio: f32,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip unreadable pages).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the excerpt length.
    pub fn with_excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars;
        self
    }

    /// Set table detector settings for PDF pages.
    pub fn with_pdf_tables(mut self, config: TableDetectorConfig) -> Self {
        self.pdf_tables = config;
        self
    }

    /// Set table detector settings for plain-text pages.
    pub fn with_text_tables(mut self, config: TableDetectorConfig) -> Self {
        self.text_tables = config;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            parallel: true,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            pdf_tables: TableDetectorConfig::default(),
            text_tables: TableDetectorConfig::for_plain_text(),
            poor_ocr_ratio: 0.05,
        }
    }
}

/// Error handling mode for pages inside a document.
///
/// Whole-document failures are always skipped and recorded; this only
/// decides whether one bad page fails its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// A failing page fails the document
    #[default]
    Strict,
    /// Skip failing pages and continue
    Lenient,
}
