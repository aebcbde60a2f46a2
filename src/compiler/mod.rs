pub mod emitter;
pub mod mapper;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod types;

pub use emitter::{ArtifactEmitter, Emitted, StepArtifactStatus, render_feature, render_step_module};
pub use mapper::{ActionRule, Mapping, StepMapper, map};
pub use parser::{ParsedInput, parse_scenarios};
pub use pipeline::Compiler;
pub use registry::StepRegistry;
pub use types::{ActionKind, ActionSpec, CompileError, CompileResult, PatternMismatch, Scenario, ScenarioMap, StepKeyword, StepPhrase};
