//! Types for compile run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::compiler::emitter::StepArtifactStatus;

/// What happened to one input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    /// Artifacts were generated
    Compiled,
    /// No scenario marker found, nothing generated
    NoScenarios,
    /// Extension not recognized
    Unsupported,
    /// Reading or writing failed
    Failed,
}

/// Result of processing a single input file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// The input file
    pub source: PathBuf,

    pub outcome: FileOutcome,

    /// Scenario names in declaration order
    pub scenarios: Vec<String>,

    /// Generated feature file, if any
    pub feature_path: Option<PathBuf>,

    /// Step module path and whether it was written or skipped
    pub step_artifact: Option<(PathBuf, StepArtifactStatus)>,

    /// Phrases that received new step code
    pub new_steps: Vec<String>,

    /// Non-fatal problems, such as pattern mismatches
    pub warnings: Vec<String>,
}

impl FileReport {
    pub fn new(source: impl Into<PathBuf>, outcome: FileOutcome) -> Self {
        Self {
            source: source.into(),
            outcome,
            scenarios: Vec::new(),
            feature_path: None,
            step_artifact: None,
            new_steps: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Result of a complete compile run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// One entry per input file, in processing order
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn count(&self, outcome: FileOutcome) -> usize {
        self.files.iter().filter(|f| f.outcome == outcome).count()
    }

    pub fn warning_count(&self) -> usize {
        self.files.iter().map(|f| f.warnings.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_and_json() {
        let now = Utc::now();
        let report = RunReport {
            started_at: now,
            finished_at: now,
            files: vec![
                FileReport::new("a.txt", FileOutcome::Compiled).with_warning("mismatch"),
                FileReport::new("b.pdf", FileOutcome::Unsupported),
                FileReport::new("c.txt", FileOutcome::Compiled),
            ],
        };
        assert_eq!(report.count(FileOutcome::Compiled), 2);
        assert_eq!(report.count(FileOutcome::Failed), 0);
        assert_eq!(report.warning_count(), 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["files"][1]["outcome"], "unsupported");
        assert_eq!(json["files"][0]["warnings"][0], "mismatch");
    }
}
