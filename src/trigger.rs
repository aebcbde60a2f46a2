//! Hands generated feature files to the external test runner.
//!
//! Runs are fire-and-forget: the runner's exit status is logged but never
//! returned, and a runner that cannot be launched only produces a warning.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Executes a generated feature file
pub trait TestRunner {
    fn run(&self, feature_path: &Path);
}

/// Runs an external program with the feature path as its last argument
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Extra arguments placed before the feature path
    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl TestRunner for CommandRunner {
    fn run(&self, feature_path: &Path) {
        tracing::info!(runner = %self.program, feature = %feature_path.display(), "running feature");
        match Command::new(&self.program).args(&self.args).arg(feature_path).status() {
            Ok(status) => tracing::debug!(runner = %self.program, %status, "runner finished"),
            Err(e) => tracing::warn!(runner = %self.program, error = %e, "could not launch test runner"),
        }
    }
}

/// Skips execution entirely
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRunner;

impl TestRunner for NoopRunner {
    fn run(&self, feature_path: &Path) {
        tracing::debug!(feature = %feature_path.display(), "execution disabled, not running feature");
    }
}

/// Remembers which features it was asked to run
#[derive(Debug, Default)]
pub struct RecordingRunner {
    runs: RefCell<Vec<PathBuf>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<PathBuf> {
        self.runs.borrow().clone()
    }
}

impl TestRunner for RecordingRunner {
    fn run(&self, feature_path: &Path) {
        self.runs.borrow_mut().push(feature_path.to_path_buf());
    }
}

impl<T: TestRunner + ?Sized> TestRunner for &T {
    fn run(&self, feature_path: &Path) {
        (**self).run(feature_path)
    }
}
