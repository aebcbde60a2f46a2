use std::path::Path;

use chrono::Utc;

use super::emitter::ArtifactEmitter;
use super::parser::parse_scenarios;
use super::registry::StepRegistry;
use super::types::{CompileError, CompileResult};
use crate::config::BootstrapSettings;
use crate::input::{self, DecodeError};
use crate::layout::Layout;
use crate::report::{FileOutcome, FileReport, RunReport};
use crate::trigger::TestRunner;

/// Compiles every input file of a layout, one at a time.
///
/// Holds the only state shared between files: the step registry and the
/// first application address seen in any input.
pub struct Compiler<R: TestRunner> {
    layout: Layout,
    bootstrap: BootstrapSettings,
    emitter: ArtifactEmitter,
    runner: R,
    registry: StepRegistry,
    target_app: Option<String>,
}

impl<R: TestRunner> Compiler<R> {
    pub fn new(layout: Layout, bootstrap: BootstrapSettings, runner: R) -> Self {
        Self {
            layout,
            bootstrap,
            emitter: ArtifactEmitter::default(),
            runner,
            registry: StepRegistry::new(),
            target_app: None,
        }
    }

    /// Replace the emitter, e.g. to use a custom mapping chain
    pub fn with_emitter(mut self, emitter: ArtifactEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn target_app(&self) -> Option<&str> {
        self.target_app.as_deref()
    }

    /// Address used by the "I open the application" step
    pub fn bootstrap_url(&self) -> &str {
        match (&self.target_app, self.bootstrap.use_parsed_target) {
            (Some(target), true) => target,
            _ => &self.bootstrap.url,
        }
    }

    /// Prepare directories, load the registry and compile every input file
    pub fn run(&mut self) -> CompileResult<RunReport> {
        let started_at = Utc::now();

        self.layout.init().map_err(|source| CompileError::Layout {
            path: self.layout.input_dir.clone(),
            source,
        })?;
        self.registry = StepRegistry::scan(&self.layout.steps_dir)?;

        let inputs = self.layout.list_inputs()?;
        tracing::info!(dir = %self.layout.input_dir.display(), files = inputs.len(), "processing test inputs");

        let mut files = Vec::with_capacity(inputs.len());
        for path in &inputs {
            let report = match self.process_file(path) {
                Ok(report) => report,
                Err(CompileError::Decode(DecodeError::UnsupportedFormat(ext))) => {
                    tracing::warn!(file = %path.display(), extension = %ext, "unsupported file type, skipping");
                    FileReport::new(path, FileOutcome::Unsupported).with_warning(format!("unsupported file type: {}", ext))
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "failed to process file");
                    FileReport::new(path, FileOutcome::Failed).with_warning(e.to_string())
                }
            };
            files.push(report);
        }

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            files,
        })
    }

    /// Compile one input file: decode, parse, emit artifacts and run the feature
    pub fn process_file(&mut self, path: &Path) -> CompileResult<FileReport> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        tracing::info!(file = %file_name, "processing");

        let lines = input::decode(path)?;
        tracing::debug!(file = %file_name, ?lines, "extracted lines");

        let parsed = parse_scenarios(&lines);
        if self.target_app.is_none() {
            self.target_app = parsed.target_app.clone();
        }

        let mut report = FileReport::new(path, FileOutcome::NoScenarios);
        if parsed.is_empty() {
            tracing::info!(file = %file_name, "no scenarios found");
            return Ok(report);
        }
        tracing::debug!(file = %file_name, scenarios = ?parsed.scenarios, "extracted scenarios");

        let feature_path = self.layout.feature_path(&file_name);
        let steps_path = self.layout.steps_path(&file_name);
        let bootstrap_url = self.bootstrap_url().to_string();
        let emitted = self.emitter.emit(
            &file_name,
            &parsed.scenarios,
            &feature_path,
            &steps_path,
            &mut self.registry,
            &bootstrap_url,
        )?;

        self.runner.run(&emitted.feature_path);

        report.outcome = FileOutcome::Compiled;
        report.scenarios = parsed.scenarios.keys().cloned().collect();
        report.feature_path = Some(emitted.feature_path);
        report.step_artifact = Some((emitted.steps_path, emitted.step_status));
        report.new_steps = emitted.new_steps;
        report.warnings = emitted.mismatches.iter().map(ToString::to_string).collect();
        Ok(report)
    }
}
