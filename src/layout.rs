//! Directory layout for inputs and generated artifacts.
//!
//! Keeps path conventions in one place:
//! - inputs are the regular files directly inside the input directory
//! - `<features_dir>/<name>.feature` holds the scenario artifact
//! - `<steps_dir>/<name>_steps.py` holds the step artifact
//!
//! where `<name>` is the input file name with spaces replaced by underscores.

use std::fs;
use std::path::{Path, PathBuf};

use crate::compiler::registry::STEP_FILE_SUFFIX;
use crate::config::PathSettings;

/// Resolved input and output directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub input_dir: PathBuf,
    pub features_dir: PathBuf,
    pub steps_dir: PathBuf,
}

impl Layout {
    pub fn new(input_dir: impl Into<PathBuf>, features_dir: impl Into<PathBuf>, steps_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            features_dir: features_dir.into(),
            steps_dir: steps_dir.into(),
        }
    }

    /// Layout rooted at `root` using the default directory names
    pub fn rooted(root: &Path) -> Self {
        let defaults = PathSettings::defaults();
        Self::new(
            root.join(defaults.input_dir),
            root.join(defaults.features_dir),
            root.join(defaults.steps_dir),
        )
    }

    /// Create all directories, including a missing input directory
    pub fn init(&self) -> std::io::Result<()> {
        if !self.input_dir.exists() {
            tracing::info!(path = %self.input_dir.display(), "input directory missing, creating it");
        }
        fs::create_dir_all(&self.input_dir)?;
        fs::create_dir_all(&self.features_dir)?;
        fs::create_dir_all(&self.steps_dir)?;
        Ok(())
    }

    /// Regular files in the input directory, sorted by name
    pub fn list_inputs(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut inputs = Vec::new();
        if self.input_dir.exists() {
            for entry in fs::read_dir(&self.input_dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_file() {
                    inputs.push(path);
                }
            }
        }
        inputs.sort();
        Ok(inputs)
    }

    /// Scenario artifact path for an input file name
    pub fn feature_path(&self, file_name: &str) -> PathBuf {
        self.features_dir.join(format!("{}.feature", artifact_name(file_name)))
    }

    /// Step artifact path for an input file name
    pub fn steps_path(&self, file_name: &str) -> PathBuf {
        self.steps_dir.join(format!("{}{}", artifact_name(file_name), STEP_FILE_SUFFIX))
    }
}

impl From<&PathSettings> for Layout {
    fn from(settings: &PathSettings) -> Self {
        Self::new(&settings.input_dir, &settings.features_dir, &settings.steps_dir)
    }
}

/// Artifact base name for an input file name
pub fn artifact_name(file_name: &str) -> String {
    file_name.replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths() {
        let layout = Layout::new("in", "features", "features/steps");
        assert_eq!(layout.feature_path("login flow.txt"), PathBuf::from("features/login_flow.txt.feature"));
        assert_eq!(layout.steps_path("login flow.txt"), PathBuf::from("features/steps/login_flow.txt_steps.py"));
    }

    #[test]
    fn test_from_path_settings() {
        let layout = Layout::from(&PathSettings::defaults());
        assert_eq!(layout, Layout::new("test_inputs", "features", "features/steps"));
    }

    #[test]
    fn test_init_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::rooted(dir.path());
        assert!(!layout.input_dir.exists());

        layout.init().unwrap();
        assert!(layout.input_dir.is_dir());
        assert!(layout.features_dir.is_dir());
        assert!(layout.steps_dir.is_dir());
        assert!(layout.list_inputs().unwrap().is_empty());
    }

    #[test]
    fn test_list_inputs_sorted_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::rooted(dir.path());
        layout.init().unwrap();
        fs::write(layout.input_dir.join("b.txt"), "").unwrap();
        fs::write(layout.input_dir.join("a.csv"), "").unwrap();
        fs::create_dir(layout.input_dir.join("nested")).unwrap();

        let names: Vec<_> = layout
            .list_inputs()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.txt"]);
    }
}
