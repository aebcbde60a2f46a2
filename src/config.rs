//! Configuration management with environment variable support.
//!
//! Every knob has a compiled-in default, may be overridden by an environment
//! variable, and is finally overridable by the matching CLI argument.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SCENARIO_FORGE_INPUT_DIR` | Directory scanned for test inputs | `test_inputs` |
//! | `SCENARIO_FORGE_FEATURES_DIR` | Output directory for `.feature` files | `features` |
//! | `SCENARIO_FORGE_STEPS_DIR` | Output directory for step modules | `features/steps` |
//! | `SCENARIO_FORGE_BOOTSTRAP_URL` | Target of the "I open the application" step | `http://localhost:3000/crud-app` |
//! | `SCENARIO_FORGE_RUNNER` | Test runner program | `behave` |
//! | `SCENARIO_FORGE_LLM_ENDPOINT` | Chat completions endpoint used by `draft` | `http://127.0.0.1:8080/v1/chat/completions` |
//! | `SCENARIO_FORGE_LLM_MODEL` | Model name used by `draft` | `t5-base` |
//! | `SCENARIO_FORGE_LLM_MAX_TOKENS` | Maximum tokens per drafted test case | `50` |
//! | `SCENARIO_FORGE_LLM_TIMEOUT` | LLM activity timeout in seconds | `60` |
//! | `SCENARIO_FORGE_LLM_CONNECT_TIMEOUT` | LLM connection timeout in seconds | `10` |
//!
//! # Example
//!
//! ```bash
//! export SCENARIO_FORGE_BOOTSTRAP_URL="http://localhost:8000/"
//! export SCENARIO_FORGE_RUNNER="/opt/venv/bin/behave"
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// Default directory holding test input files
pub const DEFAULT_INPUT_DIR: &str = "test_inputs";

/// Default directory for generated scenario artifacts
pub const DEFAULT_FEATURES_DIR: &str = "features";

/// Default directory for generated step artifacts
pub const DEFAULT_STEPS_DIR: &str = "features/steps";

/// Fixed entry point opened by the bootstrap step
pub const DEFAULT_BOOTSTRAP_URL: &str = "http://localhost:3000/crud-app";

/// Default test runner program
pub const DEFAULT_RUNNER: &str = "behave";

/// Default chat completions endpoint
pub const DEFAULT_LLM_ENDPOINT: &str = "http://127.0.0.1:8080/v1/chat/completions";

/// Default model name
pub const DEFAULT_LLM_MODEL: &str = "t5-base";

/// Default max tokens per drafted test case
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 50;

/// Default LLM connection timeout (seconds)
pub const DEFAULT_LLM_CONNECT_TIMEOUT: u64 = 10;

/// Default LLM activity timeout (seconds)
pub const DEFAULT_LLM_ACTIVITY_TIMEOUT: u64 = 60;

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_INPUT_DIR: &str = "SCENARIO_FORGE_INPUT_DIR";
pub const ENV_FEATURES_DIR: &str = "SCENARIO_FORGE_FEATURES_DIR";
pub const ENV_STEPS_DIR: &str = "SCENARIO_FORGE_STEPS_DIR";
pub const ENV_BOOTSTRAP_URL: &str = "SCENARIO_FORGE_BOOTSTRAP_URL";
pub const ENV_RUNNER: &str = "SCENARIO_FORGE_RUNNER";
pub const ENV_LLM_ENDPOINT: &str = "SCENARIO_FORGE_LLM_ENDPOINT";
pub const ENV_LLM_MODEL: &str = "SCENARIO_FORGE_LLM_MODEL";
pub const ENV_LLM_MAX_TOKENS: &str = "SCENARIO_FORGE_LLM_MAX_TOKENS";
pub const ENV_LLM_ACTIVITY_TIMEOUT: &str = "SCENARIO_FORGE_LLM_TIMEOUT";
pub const ENV_LLM_CONNECT_TIMEOUT: &str = "SCENARIO_FORGE_LLM_CONNECT_TIMEOUT";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Where inputs are read and artifacts are written
    pub paths: PathSettings,
    /// Generated bootstrap steps
    pub bootstrap: BootstrapSettings,
    /// External test runner
    pub runner: RunnerSettings,
    /// Language model used for drafting test cases
    pub llm: LlmSettings,
}

/// Directory layout settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSettings {
    pub input_dir: PathBuf,
    pub features_dir: PathBuf,
    pub steps_dir: PathBuf,
}

/// Bootstrap step settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSettings {
    /// Address navigated to by "I open the application"
    pub url: String,
    /// Prefer the address parsed from an `open <host>` input line over `url`
    pub use_parsed_target: bool,
}

/// Test runner settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Program invoked with the feature file path
    pub program: String,
}

/// LLM settings
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    /// Connection timeout (seconds)
    pub connect_timeout: u64,
    /// Activity timeout during streaming (seconds)
    pub activity_timeout: u64,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            paths: PathSettings::from_env(),
            bootstrap: BootstrapSettings::from_env(),
            runner: RunnerSettings::from_env(),
            llm: LlmSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            paths: PathSettings::defaults(),
            bootstrap: BootstrapSettings::defaults(),
            runner: RunnerSettings::defaults(),
            llm: LlmSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PathSettings {
    pub fn from_env() -> Self {
        Self {
            input_dir: env_path(ENV_INPUT_DIR, DEFAULT_INPUT_DIR),
            features_dir: env_path(ENV_FEATURES_DIR, DEFAULT_FEATURES_DIR),
            steps_dir: env_path(ENV_STEPS_DIR, DEFAULT_STEPS_DIR),
        }
    }

    pub fn defaults() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            features_dir: PathBuf::from(DEFAULT_FEATURES_DIR),
            steps_dir: PathBuf::from(DEFAULT_STEPS_DIR),
        }
    }
}

impl BootstrapSettings {
    pub fn from_env() -> Self {
        Self {
            url: env::var(ENV_BOOTSTRAP_URL).unwrap_or_else(|_| DEFAULT_BOOTSTRAP_URL.to_string()),
            use_parsed_target: false,
        }
    }

    pub fn defaults() -> Self {
        Self {
            url: DEFAULT_BOOTSTRAP_URL.to_string(),
            use_parsed_target: false,
        }
    }
}

impl RunnerSettings {
    pub fn from_env() -> Self {
        Self {
            program: env::var(ENV_RUNNER).unwrap_or_else(|_| DEFAULT_RUNNER.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            program: DEFAULT_RUNNER.to_string(),
        }
    }
}

impl LlmSettings {
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var(ENV_LLM_ENDPOINT).unwrap_or_else(|_| DEFAULT_LLM_ENDPOINT.to_string()),
            model: env::var(ENV_LLM_MODEL).unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            max_tokens: env_parse(ENV_LLM_MAX_TOKENS, DEFAULT_LLM_MAX_TOKENS),
            connect_timeout: env_parse(ENV_LLM_CONNECT_TIMEOUT, DEFAULT_LLM_CONNECT_TIMEOUT),
            activity_timeout: env_parse(ENV_LLM_ACTIVITY_TIMEOUT, DEFAULT_LLM_ACTIVITY_TIMEOUT),
        }
    }

    pub fn defaults() -> Self {
        Self {
            endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            max_tokens: DEFAULT_LLM_MAX_TOKENS,
            connect_timeout: DEFAULT_LLM_CONNECT_TIMEOUT,
            activity_timeout: DEFAULT_LLM_ACTIVITY_TIMEOUT,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
