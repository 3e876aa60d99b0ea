//! JSON rendering for plan graphs, reports, estimates and run results.

use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize any pipeline value to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value)?,
        JsonFormat::Compact => serde_json::to_string(value)?,
    };
    Ok(json)
}

/// Serialize to JSON and write it to a file.
pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
    format: JsonFormat,
) -> Result<()> {
    std::fs::write(path, to_json(value, format)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Finding, PlanGraph, Severity};

    #[test]
    fn test_to_json_pretty() {
        let graph = PlanGraph::new();
        let json = to_json(&graph, JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"schedules\""));
        assert!(json.contains("\"windows\""));
        assert!(json.contains('\n')); // Pretty has newlines
    }

    #[test]
    fn test_to_json_compact() {
        let finding = Finding::new(Severity::Red, "Structural", "S-201", "IRC R502").with_code("RR-101");
        let json = to_json(&finding, JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n')); // Compact has no newlines
        assert!(json.contains("\"RR-101\""));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        write_json(&PlanGraph::new(), &path, JsonFormat::Compact).unwrap();
        let back: PlanGraph = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, PlanGraph::new());
    }
}
