//! Error types for the planscope library.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for planscope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while processing a plan set.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The document format could not be recognized.
    #[error("Unknown document format: {0}")]
    UnknownFormat(String),

    /// No decoder is registered for the MIME type.
    #[error("Unsupported MIME type: {0}")]
    UnsupportedMime(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// A plan document could not be opened or decoded.
    #[error("Failed to parse document '{document}': {reason}")]
    DocumentParse { document: String, reason: String },

    /// A rule pack failed internally.
    #[error("Rule pack '{pack}' failed: {reason}")]
    RuleEvaluation { pack: String, reason: String },

    /// No price could be resolved for a quantity.
    #[error("No price for trade '{trade}', item '{item}'")]
    PricingResolution { trade: String, item: String },

    /// Invalid configuration or reference data.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The run was cancelled before completion.
    #[error("Run cancelled")]
    Cancelled,

    /// Unanticipated failure that aborts a run.
    #[error("Run failed: {0}")]
    RunFatal(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "pdf")]
impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

/// Category of a failure that was recovered locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A document was skipped.
    DocumentParse,
    /// A rule pack contributed zero findings after failing.
    RuleEvaluation,
    /// A line item was priced with the placeholder unit cost.
    PricingResolution,
    /// The regional resolver fell back to a broader or neutral factor.
    RegionalLookupMiss,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::DocumentParse => "document_parse",
            DiagnosticKind::RuleEvaluation => "rule_evaluation",
            DiagnosticKind::PricingResolution => "pricing_resolution",
            DiagnosticKind::RegionalLookupMiss => "regional_lookup_miss",
        };
        f.write_str(label)
    }
}

/// A recovered failure, kept alongside results instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What kind of failure was recovered
    pub kind: DiagnosticKind,
    /// The document, pack, line item or location key it concerns
    pub subject: String,
    /// Human-readable cause
    pub message: String,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Record a recovered error against a subject.
    pub fn from_error(kind: DiagnosticKind, subject: impl Into<String>, err: &Error) -> Self {
        Self::new(kind, subject, err.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.message)
    }
}
