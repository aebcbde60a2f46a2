use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A trimmed, non-empty step description. Compared by exact string match.
pub type StepPhrase = String;

/// Scenarios keyed by name, in declaration order
pub type ScenarioMap = IndexMap<String, Vec<StepPhrase>>;

/// A named, ordered list of step phrases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<StepPhrase>,
}

/// Positional Gherkin keyword of a step within its scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKeyword {
    Given,
    When,
    Then,
}

impl StepKeyword {
    /// Keyword for the step at `index` in a scenario of `len` steps.
    ///
    /// The first step is always `Given`, so a single-step scenario renders
    /// its only step as `Given`.
    pub fn for_position(index: usize, len: usize) -> Self {
        if index == 0 {
            StepKeyword::Given
        } else if index + 1 == len {
            StepKeyword::Then
        } else {
            StepKeyword::When
        }
    }

    /// Capitalized form used in `.feature` files
    pub fn as_gherkin(&self) -> &'static str {
        match self {
            StepKeyword::Given => "Given",
            StepKeyword::When => "When",
            StepKeyword::Then => "Then",
        }
    }

    /// Lowercase form used by step decorators
    pub fn as_decorator(&self) -> &'static str {
        match self {
            StepKeyword::Given => "given",
            StepKeyword::When => "when",
            StepKeyword::Then => "then",
        }
    }
}

/// Discriminant of an [`ActionSpec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Navigate,
    Authenticate,
    Click,
    AssertVisible,
    NoOp,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Authenticate => "authenticate",
            ActionKind::Click => "click",
            ActionKind::AssertVisible => "assert-visible",
            ActionKind::NoOp => "no-op",
        };
        f.write_str(name)
    }
}

/// Browser action derived from a step phrase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionSpec {
    /// Load `target` in the browser
    Navigate { target: String },
    /// Fill the login form and submit it
    Authenticate { identity: String, secret: String },
    /// Click the element whose text is `label`
    Click { label: String },
    /// Assert the element whose text is `label` is displayed
    AssertVisible { label: String },
    NoOp,
}

impl ActionSpec {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionSpec::Navigate { .. } => ActionKind::Navigate,
            ActionSpec::Authenticate { .. } => ActionKind::Authenticate,
            ActionSpec::Click { .. } => ActionKind::Click,
            ActionSpec::AssertVisible { .. } => ActionKind::AssertVisible,
            ActionSpec::NoOp => ActionKind::NoOp,
        }
    }

    /// Parameters keyed by name
    pub fn parameters(&self) -> BTreeMap<&'static str, &str> {
        let mut params = BTreeMap::new();
        match self {
            ActionSpec::Navigate { target } => {
                params.insert("target", target.as_str());
            }
            ActionSpec::Authenticate { identity, secret } => {
                params.insert("identity", identity.as_str());
                params.insert("secret", secret.as_str());
            }
            ActionSpec::Click { label } | ActionSpec::AssertVisible { label } => {
                params.insert("label", label.as_str());
            }
            ActionSpec::NoOp => {}
        }
        params
    }
}

/// A mapper rule matched its keyword but not its required shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMismatch {
    /// Name of the rule that claimed the phrase
    pub rule: String,
    /// The phrase that failed to match
    pub phrase: StepPhrase,
    /// What the rule expected
    pub expected: String,
}

impl fmt::Display for PatternMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step '{}' matched rule '{}' but not its pattern ({}); treated as no-op",
            self.phrase, self.rule, self.expected
        )
    }
}

/// Result type for compiler operations
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors that can occur while compiling a directory
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("could not prepare output directory {path}: {source}")]
    Layout {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write artifact {path}: {source}")]
    WriteArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode input: {0}")]
    Decode(#[from] crate::input::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
