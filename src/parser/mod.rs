//! Quantity extraction: PDF access, text layout, table detection,
//! classification and confidence scoring.

pub mod backend;
pub mod classify;
mod extractor;
pub mod layout;
mod options;
pub mod quantities;
pub mod table_detector;

pub use extractor::QuantityExtractor;
pub use layout::{TextLine, TextSpan};
pub use options::{ErrorMode, ExtractOptions, DEFAULT_EXCERPT_CHARS};
pub use table_detector::{DetectedTable, TableDetector, TableDetectorConfig, TableRowData};
