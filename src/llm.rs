//! Language model client for drafting test cases.
//!
//! Talks to an OpenAI-compatible chat completions endpoint through `curl`,
//! streaming the reply so a slow model is only abandoned after a period of
//! silence rather than a fixed total timeout.
//!
//! # Configuration
//!
//! - `SCENARIO_FORGE_LLM_ENDPOINT`: API endpoint URL
//! - `SCENARIO_FORGE_LLM_MODEL`: Model name
//! - `SCENARIO_FORGE_LLM_MAX_TOKENS`: Max tokens per reply
//! - `SCENARIO_FORGE_LLM_TIMEOUT`: Activity timeout (seconds)
//! - `SCENARIO_FORGE_LLM_CONNECT_TIMEOUT`: Connection timeout (seconds)

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::compiler::parser::SCENARIO_MARKER;
use crate::config;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors that can occur while talking to the model
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("No response for {0:?}")]
    ActivityTimeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the LLM client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    /// Timeout for the initial connection (seconds)
    pub connection_timeout: u64,
    /// Timeout for inactivity during streaming (seconds)
    pub activity_timeout: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            endpoint: cfg.llm.endpoint.clone(),
            model: cfg.llm.model.clone(),
            max_tokens: cfg.llm.max_tokens,
            connection_timeout: cfg.llm.connect_timeout,
            activity_timeout: cfg.llm.activity_timeout,
        }
    }
}

impl LlmConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn activity_timeout(mut self, seconds: u64) -> Self {
        self.activity_timeout = seconds;
        self
    }
}

/// Anything that turns a prompt into text
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> LlmResult<String>;
}

/// Chat completions client backed by `curl`
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Check that the endpoint accepts connections.
    ///
    /// Any HTTP status counts as reachable; only a failed connection does not.
    pub fn check_health(&self, timeout_secs: u64) -> LlmResult<bool> {
        let output = Command::new("curl")
            .args([
                "-s",
                "-o", "/dev/null",
                "-w", "%{http_code}",
                "--connect-timeout", &timeout_secs.to_string(),
                "--max-time", &timeout_secs.to_string(),
                "-I",
                &base_url(&self.config.endpoint),
            ])
            .output()?;

        let code: u16 = String::from_utf8_lossy(&output.stdout).trim().parse().unwrap_or(0);
        Ok(code > 0)
    }

    /// Send one prompt and collect the streamed reply
    pub fn complete(&self, prompt: &str) -> LlmResult<String> {
        let request_json = serde_json::to_string(&chat_request(&self.config, prompt, true))
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let mut child = Command::new("curl")
            .args([
                "-s",
                "-N",
                "-X", "POST",
                &self.config.endpoint,
                "-H", "Content-Type: application/json",
                "-d", &request_json,
                "--connect-timeout", &self.config.connection_timeout.to_string(),
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LlmError::Io(std::io::Error::other("Failed to capture stdout")))?;

        let (tx, rx) = mpsc::channel();
        let activity_timeout = Duration::from_secs(self.config.activity_timeout);

        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
        });

        let mut content = String::new();
        let mut last_activity = Instant::now();

        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(line)) => {
                    last_activity = Instant::now();
                    match parse_stream_line(&line) {
                        StreamEvent::Delta(delta) => content.push_str(&delta),
                        StreamEvent::Done => break,
                        StreamEvent::Ignored => {}
                    }
                }
                Ok(Err(e)) => return Err(LlmError::Io(e)),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if last_activity.elapsed() > activity_timeout {
                        let _ = child.kill();
                        return Err(LlmError::ActivityTimeout(activity_timeout));
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        let status = child.wait()?;
        if !status.success() && content.is_empty() {
            return Err(LlmError::ConnectionFailed("curl process failed".to_string()));
        }

        if content.is_empty() {
            return self.complete_non_streaming(prompt);
        }
        Ok(content)
    }

    /// Fallback for servers that ignore `"stream": true`
    fn complete_non_streaming(&self, prompt: &str) -> LlmResult<String> {
        let request_json = serde_json::to_string(&chat_request(&self.config, prompt, false))
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let output = Command::new("curl")
            .args([
                "-s",
                "-X", "POST",
                &self.config.endpoint,
                "-H", "Content-Type: application/json",
                "-d", &request_json,
                "--connect-timeout", &self.config.connection_timeout.to_string(),
            ])
            .output()?;

        if !output.status.success() {
            return Err(LlmError::ConnectionFailed(String::from_utf8_lossy(&output.stderr).to_string()));
        }

        let response: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        message_content(&response).ok_or_else(|| LlmError::InvalidResponse("no message content".to_string()))
    }
}

impl TextGenerator for LlmClient {
    fn generate(&self, prompt: &str) -> LlmResult<String> {
        self.complete(prompt)
    }
}

fn chat_request(config: &LlmConfig, prompt: &str, stream: bool) -> serde_json::Value {
    serde_json::json!({
        "model": config.model,
        "messages": [{ "role": "user", "content": prompt }],
        "max_tokens": config.max_tokens,
        "stream": stream
    })
}

/// `scheme://host:port` part of an endpoint URL
fn base_url(endpoint: &str) -> String {
    let (scheme, rest) = endpoint.split_once("://").unwrap_or(("http", endpoint));
    let host_port = rest.split('/').next().unwrap_or("127.0.0.1:8080");
    format!("{}://{}", scheme, host_port)
}

#[derive(Debug, PartialEq, Eq)]
enum StreamEvent {
    Delta(String),
    Done,
    Ignored,
}

/// Interpret one server-sent-events line of a streamed completion
fn parse_stream_line(line: &str) -> StreamEvent {
    let Some(data) = line.strip_prefix("data: ") else {
        return StreamEvent::Ignored;
    };
    if data.trim() == "[DONE]" {
        return StreamEvent::Done;
    }
    let Ok(json) = serde_json::from_str::<serde_json::Value>(data) else {
        return StreamEvent::Ignored;
    };
    match json["choices"][0]["delta"]["content"].as_str() {
        Some(delta) => StreamEvent::Delta(delta.to_string()),
        None => StreamEvent::Ignored,
    }
}

fn message_content(response: &serde_json::Value) -> Option<String> {
    let message = &response["choices"][0]["message"];
    message["content"]
        .as_str()
        .filter(|c| !c.is_empty())
        .or_else(|| message["reasoning_content"].as_str())
        .map(str::to_string)
}

// ============================================================================
// Test case drafting
// ============================================================================

/// Prompt asking the model for one test case
pub fn build_draft_prompt(action: &str, input: &str) -> String {
    format!("Generate test case for {} with {}.", action, input)
}

/// Lead sentence of a drafted test case
pub fn draft_summary(action: &str, input: &str) -> String {
    format!("Test that the app allows the user to {} with {}.", action, input)
}

/// A drafted scenario for one action/input pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftedCase {
    pub action: String,
    pub input: String,
    /// Non-blank lines of the model's reply
    pub lines: Vec<String>,
}

impl DraftedCase {
    /// Render as a scenario block the compiler can read back
    pub fn to_scenario_text(&self) -> String {
        let mut text = format!("{} {} with {}\n", SCENARIO_MARKER, self.action, self.input);
        text.push_str(&draft_summary(&self.action, &self.input));
        text.push('\n');
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

/// Draft one test case per action/input pair.
///
/// A pair whose generation fails is still drafted, with no model lines.
pub fn draft_test_cases<G: TextGenerator + ?Sized>(
    generator: &G,
    actions: &[String],
    inputs: &[String],
) -> Vec<DraftedCase> {
    let mut cases = Vec::with_capacity(actions.len() * inputs.len());
    for action in actions {
        for input in inputs {
            let prompt = build_draft_prompt(action, input);
            let lines = match generator.generate(&prompt) {
                Ok(reply) => reply
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect(),
                Err(e) => {
                    tracing::warn!(%action, %input, error = %e, "test case generation failed");
                    Vec::new()
                }
            };
            cases.push(DraftedCase {
                action: action.clone(),
                input: input.clone(),
                lines,
            });
        }
    }
    cases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::parse_scenarios;

    struct CannedGenerator;

    impl TextGenerator for CannedGenerator {
        fn generate(&self, prompt: &str) -> LlmResult<String> {
            if prompt.contains("register") {
                Err(LlmError::ConnectionFailed("offline".to_string()))
            } else {
                Ok("open localhost:3000\n\n  click Login  \n".to_string())
            }
        }
    }

    #[test]
    fn test_build_draft_prompt() {
        assert_eq!(
            build_draft_prompt("login", "valid credentials"),
            "Generate test case for login with valid credentials."
        );
    }

    #[test]
    fn test_draft_cases_cover_every_pair() {
        let actions = vec!["login".to_string(), "register".to_string()];
        let inputs = vec!["valid credentials".to_string(), "empty fields".to_string()];
        let cases = draft_test_cases(&CannedGenerator, &actions, &inputs);

        assert_eq!(cases.len(), 4);
        assert_eq!(cases[0].lines, vec!["open localhost:3000", "click Login"]);
        assert!(cases[2].lines.is_empty());
    }

    #[test]
    fn test_drafted_case_parses_as_scenario() {
        let case = DraftedCase {
            action: "login".to_string(),
            input: "valid credentials".to_string(),
            lines: vec!["click Login".to_string()],
        };
        let text = case.to_scenario_text();
        let lines: Vec<&str> = text.lines().collect();
        let parsed = parse_scenarios(&lines);

        assert_eq!(
            parsed.scenarios["login with valid credentials"],
            vec![
                "Test that the app allows the user to login with valid credentials.",
                "click Login",
            ]
        );
    }

    #[test]
    fn test_parse_stream_line() {
        assert_eq!(
            parse_stream_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#),
            StreamEvent::Delta("Hi".to_string())
        );
        assert_eq!(parse_stream_line("data: [DONE]"), StreamEvent::Done);
        assert_eq!(parse_stream_line(": keep-alive"), StreamEvent::Ignored);
        assert_eq!(parse_stream_line("data: not json"), StreamEvent::Ignored);
    }

    #[test]
    fn test_message_content_fallback() {
        let response = serde_json::json!({"choices": [{"message": {"content": "", "reasoning_content": "thought"}}]});
        assert_eq!(message_content(&response).as_deref(), Some("thought"));
        assert_eq!(message_content(&serde_json::json!({})), None);
    }

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("http://127.0.0.1:8080/v1/chat/completions"), "http://127.0.0.1:8080");
        assert_eq!(base_url("https://api.example.com/v1"), "https://api.example.com");
        assert_eq!(base_url("localhost:9000/v1"), "http://localhost:9000");
    }

    #[test]
    fn test_llm_config_builder() {
        let config = LlmConfig::new("http://localhost:8080")
            .model("llama3")
            .max_tokens(200)
            .activity_timeout(30);

        assert_eq!(config.endpoint, "http://localhost:8080");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.max_tokens, 200);
        assert_eq!(config.activity_timeout, 30);
    }
}
