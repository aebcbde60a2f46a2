//! Scenario Forge - compiles plain-language test scenarios into behave artifacts.
//!
//! This crate provides:
//! - Input decoding for text, tabular, document and feature files
//! - Scenario parsing keyed on the `test scenario` marker
//! - A step registry that keeps step definitions unique across files
//! - Rule-based mapping of step phrases to browser actions
//! - Emission of `.feature` files and Selenium step modules
//! - A fire-and-forget trigger for the external test runner
//! - LLM-assisted drafting of new test cases
//!
//! # Example
//!
//! ```rust,no_run
//! use scenario_forge::compiler::Compiler;
//! use scenario_forge::config::BootstrapSettings;
//! use scenario_forge::layout::Layout;
//! use scenario_forge::trigger::CommandRunner;
//!
//! let layout = Layout::new("test_inputs", "features", "features/steps");
//! let mut compiler = Compiler::new(layout, BootstrapSettings::defaults(), CommandRunner::new("behave"));
//! let report = compiler.run().unwrap();
//! println!("{} files processed", report.files.len());
//! ```

pub mod compiler;
pub mod config;
pub mod driver;
pub mod input;
pub mod layout;
pub mod llm;
pub mod report;
pub mod trigger;

// Re-export compiler types
pub use compiler::{
    ActionSpec, ArtifactEmitter, CompileError, CompileResult, Compiler, ParsedInput, ScenarioMap,
    StepKeyword, StepMapper, StepRegistry, map, parse_scenarios,
};

// Re-export input decoding
pub use input::{DecodeError, DecodeResult, InputFormat, decode};

// Re-export driver abstraction
pub use driver::{BrowserDriver, DriverError, DriverResult, DriverSlot, RecordingDriver, SeleniumScript};

// Re-export reports and runners
pub use layout::Layout;
pub use report::{FileOutcome, FileReport, RunReport};
pub use trigger::{CommandRunner, NoopRunner, TestRunner};

// Re-export LLM client
pub use llm::{LlmClient, LlmConfig, LlmError, LlmResult, TextGenerator, draft_test_cases};
