//! Renders scenario and step artifacts.
//!
//! The scenario artifact is a Gherkin `.feature` file and is rewritten on
//! every run. The step artifact is a behave step module holding code for
//! phrases the registry has not seen yet; it is only written when the file
//! does not exist.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::mapper::StepMapper;
use super::registry::StepRegistry;
use super::types::{ActionSpec, CompileError, CompileResult, PatternMismatch, ScenarioMap, StepKeyword, StepPhrase};
use crate::driver::{SeleniumScript, py_str};

/// Bootstrap phrase that opens the application under test
pub const OPEN_APPLICATION_STEP: &str = "I open the application";

/// Bootstrap phrase that closes the shared browser
pub const CLOSE_BROWSER_STEP: &str = "I close the browser";

const NOOP_BODY: &str = "pass  # Add custom Selenium logic here";

const STEP_MODULE_PREAMBLE: &str = r#"from behave import given, when, then
from selenium import webdriver
from selenium.webdriver.common.by import By
from selenium.webdriver.chrome.service import Service
from selenium.webdriver.chrome.options import Options
from webdriver_manager.chrome import ChromeDriverManager


def get_driver(context):
    """Return the browser owned by this run, launching it on first use."""
    driver = getattr(context, "driver", None)
    if driver is None:
        chrome_options = Options()
        chrome_options.add_argument("--start-maximized")
        service = Service(ChromeDriverManager().install())
        driver = webdriver.Chrome(service=service, options=chrome_options)
        context.driver = driver
    return driver
"#;

/// Render the Gherkin text for one source file
pub fn render_feature(title: &str, scenarios: &ScenarioMap) -> String {
    let mut out = format!("Feature: {}\n", title);
    for (name, steps) in scenarios {
        let _ = write!(out, "\n  Scenario: {}\n", name);
        for (i, step) in steps.iter().enumerate() {
            let keyword = StepKeyword::for_position(i, steps.len());
            let _ = writeln!(out, "    {} {}", keyword.as_gherkin(), step);
        }
    }
    out
}

/// A rendered step module and what went into it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedSteps {
    pub text: String,
    /// Phrases that received a block, bootstrap steps included
    pub new_steps: Vec<StepPhrase>,
    pub mismatches: Vec<PatternMismatch>,
}

/// Render step definitions for every phrase not yet in `registry`.
///
/// The registry is only read; callers record `new_steps` once the module
/// has been written. Bootstrap phrases always get their bootstrap block,
/// even when a scenario lists them as ordinary steps.
pub fn render_step_module(
    scenarios: &ScenarioMap,
    registry: &StepRegistry,
    mapper: &StepMapper,
    bootstrap_url: &str,
) -> RenderedSteps {
    let mut rendered = RenderedSteps {
        text: STEP_MODULE_PREAMBLE.to_string(),
        ..Default::default()
    };
    let mut emitted = BTreeSet::new();

    if !registry.contains(OPEN_APPLICATION_STEP) {
        let body = SeleniumScript::render(&ActionSpec::Navigate {
            target: bootstrap_url.to_string(),
        });
        push_block(&mut rendered.text, StepKeyword::Given, OPEN_APPLICATION_STEP, "step_open_application", &with_driver(body));
        rendered.new_steps.push(OPEN_APPLICATION_STEP.to_string());
    }

    let mut counter = 0usize;
    for steps in scenarios.values() {
        for (i, step) in steps.iter().enumerate() {
            if is_bootstrap_step(step) || registry.contains(step) || !emitted.insert(step.as_str()) {
                continue;
            }
            counter += 1;
            let keyword = StepKeyword::for_position(i, steps.len());
            let mapping = mapper.map_step(step);

            let body = match (&mapping.action, &mapping.mismatch) {
                (ActionSpec::NoOp, Some(mismatch)) => {
                    vec![format!("{} (expected: {})", NOOP_BODY, mismatch.expected)]
                }
                (ActionSpec::NoOp, None) => vec![NOOP_BODY.to_string()],
                (action, _) => with_driver(SeleniumScript::render(action)),
            };

            let function = format!("step_{}_{}", keyword.as_decorator(), counter);
            push_block(&mut rendered.text, keyword, step, &function, &body);

            rendered.new_steps.push(step.clone());
            rendered.mismatches.extend(mapping.mismatch);
        }
    }

    if !registry.contains(CLOSE_BROWSER_STEP) {
        let body = [
            "driver = getattr(context, \"driver\", None)",
            "if driver is not None:",
            "    driver.quit()",
            "    context.driver = None",
        ]
        .map(String::from);
        push_block(&mut rendered.text, StepKeyword::Then, CLOSE_BROWSER_STEP, "step_close_browser", &body);
        rendered.new_steps.push(CLOSE_BROWSER_STEP.to_string());
    }

    rendered
}

fn is_bootstrap_step(phrase: &str) -> bool {
    phrase == OPEN_APPLICATION_STEP || phrase == CLOSE_BROWSER_STEP
}

fn with_driver(mut body: Vec<String>) -> Vec<String> {
    body.insert(0, "driver = get_driver(context)".to_string());
    body
}

fn push_block(out: &mut String, keyword: StepKeyword, phrase: &str, function: &str, body: &[String]) {
    let _ = write!(out, "\n\n@{}({})\ndef {}(context):\n", keyword.as_decorator(), py_str(phrase), function);
    for line in body {
        let _ = writeln!(out, "    {}", line);
    }
}

/// Whether the step artifact was produced this time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepArtifactStatus {
    Written,
    /// A step artifact already existed and was left untouched
    Skipped,
}

/// Paths and results of emitting one source file's artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    pub feature_path: PathBuf,
    pub steps_path: PathBuf,
    pub step_status: StepArtifactStatus,
    pub new_steps: Vec<StepPhrase>,
    pub mismatches: Vec<PatternMismatch>,
}

/// Writes artifacts for parsed source files
#[derive(Debug)]
pub struct ArtifactEmitter {
    mapper: StepMapper,
}

impl Default for ArtifactEmitter {
    fn default() -> Self {
        Self::new(StepMapper::default())
    }
}

impl ArtifactEmitter {
    pub fn new(mapper: StepMapper) -> Self {
        Self { mapper }
    }

    pub fn mapper(&self) -> &StepMapper {
        &self.mapper
    }

    /// Write the feature file unconditionally and the step module only if
    /// `steps_path` does not exist yet
    pub fn emit(
        &self,
        title: &str,
        scenarios: &ScenarioMap,
        feature_path: &Path,
        steps_path: &Path,
        registry: &mut StepRegistry,
        bootstrap_url: &str,
    ) -> CompileResult<Emitted> {
        write_artifact(feature_path, &render_feature(title, scenarios))?;
        tracing::info!(path = %feature_path.display(), "feature file created");

        let mut emitted = Emitted {
            feature_path: feature_path.to_path_buf(),
            steps_path: steps_path.to_path_buf(),
            step_status: StepArtifactStatus::Skipped,
            new_steps: Vec::new(),
            mismatches: Vec::new(),
        };

        if steps_path.exists() {
            tracing::info!(path = %steps_path.display(), "step definition file already exists, skipping generation");
            return Ok(emitted);
        }

        let rendered = render_step_module(scenarios, registry, &self.mapper, bootstrap_url);
        write_artifact(steps_path, &rendered.text)?;
        registry.extend(rendered.new_steps.iter().cloned());
        tracing::info!(path = %steps_path.display(), new_steps = rendered.new_steps.len(), "step definitions created");

        emitted.step_status = StepArtifactStatus::Written;
        emitted.new_steps = rendered.new_steps;
        emitted.mismatches = rendered.mismatches;
        Ok(emitted)
    }
}

fn write_artifact(path: &Path, content: &str) -> CompileResult<()> {
    fs::write(path, content).map_err(|source| CompileError::WriteArtifact {
        path: path.to_path_buf(),
        source,
    })
}
