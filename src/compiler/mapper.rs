//! Step-to-action mapping.
//!
//! A [`StepMapper`] holds an ordered chain of [`ActionRule`]s. The first rule
//! that claims a phrase decides its action; a phrase no rule claims is a
//! no-op. Rules test for keywords, not whole phrases, so rule order is the
//! only tie-breaker.
//!
//! | Order | Keyword | Action |
//! |-------|---------|--------|
//! | 1 | `open` + a network host | [`ActionSpec::Navigate`] |
//! | 2 | `Login using` | [`ActionSpec::Authenticate`] |
//! | 3 | `click` | [`ActionSpec::Click`] |
//! | 4 | `verify` | [`ActionSpec::AssertVisible`] |

use once_cell::sync::Lazy;
use regex::Regex;

use super::parser::extract_open_target;
use super::types::{ActionSpec, PatternMismatch};

static NETWORK_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^(?:
            [a-z][a-z0-9+.\-]*://\S+                                  # scheme://anything
          | localhost(?:[:/]\S*)?                                     # localhost[:port][/path]
          | \d{1,3}(?:\.\d{1,3}){3}(?::\d+)?(?:/\S*)?                 # IPv4[:port][/path]
          | [a-z0-9\-]+(?:\.[a-z0-9\-]+)*:\d+(?:/\S*)?                # host:port[/path]
          | (?:[a-z0-9\-]+\.)+[a-z]{2,}(?::\d+)?(?:/\S*)?             # dotted.host[/path]
        )$",
    )
    .expect("valid regex")
});

static LOGIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Login using (\S+) (\S+) and (\S+) (\S+)").expect("valid regex"));

/// One link of the mapping chain
pub trait ActionRule: Send + Sync {
    /// Short identifier used in diagnostics
    fn name(&self) -> &'static str;

    /// Whether this rule is responsible for the phrase
    fn claims(&self, phrase: &str) -> bool;

    /// Build the action for a claimed phrase, or describe the expected shape
    fn extract(&self, phrase: &str) -> Result<ActionSpec, String>;
}

/// `open <host>` loads a page
#[derive(Debug, Default)]
pub struct NavigateRule;

impl ActionRule for NavigateRule {
    fn name(&self) -> &'static str {
        "navigate"
    }

    fn claims(&self, phrase: &str) -> bool {
        phrase.contains("open") && phrase.split_whitespace().any(is_network_host)
    }

    fn extract(&self, phrase: &str) -> Result<ActionSpec, String> {
        extract_open_target(phrase)
            .map(|target| ActionSpec::Navigate { target })
            .ok_or_else(|| "open <address>".to_string())
    }
}

/// `Login using <label> <identity> and <label> <secret>` signs in
#[derive(Debug, Default)]
pub struct LoginRule;

impl ActionRule for LoginRule {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn claims(&self, phrase: &str) -> bool {
        phrase.contains("Login using")
    }

    fn extract(&self, phrase: &str) -> Result<ActionSpec, String> {
        let caps = LOGIN
            .captures(phrase)
            .ok_or_else(|| "Login using <label> <identity> and <label> <secret>".to_string())?;
        Ok(ActionSpec::Authenticate {
            identity: caps[2].to_string(),
            secret: caps[4].to_string(),
        })
    }
}

/// `click <label>` clicks an element by its text
#[derive(Debug, Default)]
pub struct ClickRule;

impl ActionRule for ClickRule {
    fn name(&self) -> &'static str {
        "click"
    }

    fn claims(&self, phrase: &str) -> bool {
        phrase.contains("click")
    }

    fn extract(&self, phrase: &str) -> Result<ActionSpec, String> {
        label_after(phrase, "click")
            .map(|label| ActionSpec::Click { label })
            .ok_or_else(|| "click <label>".to_string())
    }
}

/// `verify <label>` asserts an element with that text is shown
#[derive(Debug, Default)]
pub struct VerifyRule;

impl ActionRule for VerifyRule {
    fn name(&self) -> &'static str {
        "assert-visible"
    }

    fn claims(&self, phrase: &str) -> bool {
        phrase.contains("verify")
    }

    fn extract(&self, phrase: &str) -> Result<ActionSpec, String> {
        label_after(phrase, "verify")
            .map(|label| ActionSpec::AssertVisible { label })
            .ok_or_else(|| "verify <label>".to_string())
    }
}

/// Outcome of mapping one phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub action: ActionSpec,
    /// Rule that claimed the phrase, `None` when nothing did
    pub rule: Option<&'static str>,
    /// Set when the claiming rule could not extract its parameters
    pub mismatch: Option<PatternMismatch>,
}

/// Ordered chain of action rules
pub struct StepMapper {
    rules: Vec<Box<dyn ActionRule>>,
}

impl std::fmt::Debug for StepMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.rules.iter().map(|r| r.name())).finish()
    }
}

impl Default for StepMapper {
    fn default() -> Self {
        Self::new()
            .rule(NavigateRule)
            .rule(LoginRule)
            .rule(ClickRule)
            .rule(VerifyRule)
    }
}

impl StepMapper {
    /// An empty chain that maps everything to a no-op
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule with the lowest priority so far
    pub fn rule(mut self, rule: impl ActionRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Map a phrase, keeping the diagnostic of a failed extraction
    pub fn map_step(&self, phrase: &str) -> Mapping {
        let Some(rule) = self.rules.iter().find(|r| r.claims(phrase)) else {
            return Mapping {
                action: ActionSpec::NoOp,
                rule: None,
                mismatch: None,
            };
        };

        match rule.extract(phrase) {
            Ok(action) => Mapping {
                action,
                rule: Some(rule.name()),
                mismatch: None,
            },
            Err(expected) => {
                let mismatch = PatternMismatch {
                    rule: rule.name().to_string(),
                    phrase: phrase.to_string(),
                    expected,
                };
                tracing::warn!("{}", mismatch);
                Mapping {
                    action: ActionSpec::NoOp,
                    rule: Some(rule.name()),
                    mismatch: Some(mismatch),
                }
            }
        }
    }

    /// Map a phrase to its action
    pub fn map(&self, phrase: &str) -> ActionSpec {
        self.map_step(phrase).action
    }
}

static DEFAULT_MAPPER: Lazy<StepMapper> = Lazy::new(StepMapper::default);

/// Map a phrase with the default rule chain
pub fn map(phrase: &str) -> ActionSpec {
    DEFAULT_MAPPER.map(phrase)
}

/// Whether a whitespace-delimited token names a network location
pub fn is_network_host(token: &str) -> bool {
    let token = token.trim_end_matches(['.', ',', ';', ')', '!']);
    NETWORK_HOST.is_match(token)
}

fn label_after(phrase: &str, keyword: &str) -> Option<String> {
    let start = phrase.find(keyword)? + keyword.len();
    let label = phrase[start..].trim();
    (!label.is_empty()).then(|| label.to_string())
}
