//! Run stages and progress events.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stage of a pipeline run.
///
/// `Complete`, `Error` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued,
    Parsing,
    ExtractingQuantities,
    ComplianceChecking,
    Pricing,
    GeneratingOutputs,
    Complete,
    Error,
    Cancelled,
}

impl Stage {
    /// Progress reached when the stage starts. Terminal failures have none.
    pub fn percent(self) -> Option<u8> {
        match self {
            Stage::Queued => Some(0),
            Stage::Parsing => Some(10),
            Stage::ExtractingQuantities => Some(30),
            Stage::ComplianceChecking | Stage::Pricing => Some(50),
            Stage::GeneratingOutputs => Some(90),
            Stage::Complete => Some(100),
            Stage::Error | Stage::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Complete | Stage::Error | Stage::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Queued => "queued",
            Stage::Parsing => "parsing",
            Stage::ExtractingQuantities => "extracting_quantities",
            Stage::ComplianceChecking => "compliance_checking",
            Stage::Pricing => "pricing",
            Stage::GeneratingOutputs => "generating_outputs",
            Stage::Complete => "complete",
            Stage::Error => "error",
            Stage::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted on every stage transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub run_id: Uuid,
    pub stage: Stage,
    pub percent: u8,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(run_id: Uuid, stage: Stage, percent: u8, message: impl Into<String>) -> Self {
        Self {
            run_id,
            stage,
            percent,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_is_monotonic() {
        let order = [
            Stage::Queued,
            Stage::Parsing,
            Stage::ExtractingQuantities,
            Stage::ComplianceChecking,
            Stage::Pricing,
            Stage::GeneratingOutputs,
            Stage::Complete,
        ];
        let percents: Vec<u8> = order.iter().filter_map(|s| s.percent()).collect();
        assert_eq!(percents.len(), order.len());
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_terminal_stages() {
        assert!(Stage::Cancelled.is_terminal());
        assert!(Stage::Error.is_terminal());
        assert!(!Stage::Pricing.is_terminal());
        assert_eq!(
            serde_json::to_string(&Stage::ExtractingQuantities).unwrap(),
            "\"extracting_quantities\""
        );
    }
}
