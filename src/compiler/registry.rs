//! Registry of step phrases that already have generated automation code.
//!
//! Loaded once per run by scanning existing step modules for decorator
//! lines such as `@when('click Submit')`, then grown as new steps are
//! emitted so later files in the same run do not define them again.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::StepPhrase;

/// File-name suffix of generated step modules
pub const STEP_FILE_SUFFIX: &str = "_steps.py";

static DECORATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*@(given|when|then)\((?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")\)"#)
        .expect("valid regex")
});

/// Append-only set of realized step phrases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepRegistry {
    phrases: BTreeSet<StepPhrase>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every phrase bound in `*_steps.py` files directly under `steps_dir`.
    ///
    /// A missing directory yields an empty registry. A module that cannot be
    /// read is skipped with a warning; invalid UTF-8 is read lossily.
    pub fn scan(steps_dir: &Path) -> std::io::Result<Self> {
        let mut registry = Self::new();
        if !steps_dir.exists() {
            return Ok(registry);
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(steps_dir)? {
            let path = entry?.path();
            let is_step_file = path
                .file_name()
                .map(|n| n.to_string_lossy().ends_with(STEP_FILE_SUFFIX))
                .unwrap_or(false);
            if is_step_file && path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        for path in &files {
            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "could not read step module, skipping");
                    continue;
                }
            };
            let content = String::from_utf8_lossy(&bytes);
            let before = registry.len();
            registry.extend(phrases_in(&content));
            tracing::debug!(file = %path.display(), added = registry.len() - before, "scanned step module");
        }

        tracing::info!(files = files.len(), phrases = registry.len(), "loaded step registry");
        Ok(registry)
    }

    pub fn contains(&self, phrase: &str) -> bool {
        self.phrases.contains(phrase)
    }

    /// Record a phrase; returns `true` if it was not already present
    pub fn insert(&mut self, phrase: impl Into<StepPhrase>) -> bool {
        self.phrases.insert(phrase.into())
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Phrases in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &StepPhrase> {
        self.phrases.iter()
    }
}

impl Extend<StepPhrase> for StepRegistry {
    fn extend<I: IntoIterator<Item = StepPhrase>>(&mut self, iter: I) {
        self.phrases.extend(iter);
    }
}

impl FromIterator<StepPhrase> for StepRegistry {
    fn from_iter<I: IntoIterator<Item = StepPhrase>>(iter: I) -> Self {
        Self {
            phrases: iter.into_iter().collect(),
        }
    }
}

/// Extract every decorator-bound phrase from a step module's source
pub fn phrases_in(source: &str) -> Vec<StepPhrase> {
    source
        .lines()
        .filter_map(|line| DECORATOR.captures(line))
        .filter_map(|caps| caps.get(2).or_else(|| caps.get(3)))
        .map(|m| unescape_literal(m.as_str()))
        .collect()
}

/// Reverse the backslash escaping applied when a phrase is rendered
fn unescape_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(next) => out.push(next),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::py_str;

    const MODULE: &str = r#"
from behave import given, when, then

@given('I open the application')
def step_open_application(context):
    get_driver(context).get("http://localhost:3000/crud-app")

@when('click Submit')
def step_when_1(context):
    pass

@then("I close the browser")
def step_close_browser(context):
    pass

@then('verify it\'s done')
def step_then_2(context):
    pass

# @given('commented out')
x = "@when('not a decorator')"
"#;

    #[test]
    fn test_phrases_in_module() {
        let phrases = phrases_in(MODULE);
        assert_eq!(
            phrases,
            vec![
                "I open the application",
                "click Submit",
                "I close the browser",
                "verify it's done",
            ]
        );
    }

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StepRegistry::scan(&dir.path().join("nope")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_scan_only_step_modules() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("login_steps.py"), MODULE).unwrap();
        fs::write(dir.path().join("helpers.py"), "@when('helper step')\n").unwrap();
        fs::write(dir.path().join("cart.txt_steps.py"), "@given('add item')\n").unwrap();

        let registry = StepRegistry::scan(dir.path()).unwrap();
        assert_eq!(registry.len(), 5);
        assert!(registry.contains("add item"));
        assert!(registry.contains("click Submit"));
        assert!(!registry.contains("helper step"));
    }

    #[test]
    fn test_rendered_literals_scan_back_unchanged() {
        for phrase in ["click\tPay", "verify it's \"done\"", "type C:\\temp", "line\none\rtwo"] {
            let source = format!("@when({})\ndef step(context):\n    pass\n", py_str(phrase));
            assert_eq!(phrases_in(&source), vec![phrase]);
        }
    }

    #[test]
    fn test_scan_tolerates_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let mut legacy = b"# caf\xe9\n@when('click Legacy')\ndef legacy(context):\n    pass\n".to_vec();
        legacy.extend_from_slice(b"@then('verify caf\xe9')\n");
        fs::write(dir.path().join("legacy_steps.py"), legacy).unwrap();
        fs::write(dir.path().join("cart_steps.py"), "@given('add item')\n").unwrap();

        let registry = StepRegistry::scan(dir.path()).unwrap();
        assert!(registry.contains("click Legacy"));
        assert!(registry.contains("add item"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_insert_is_append_only() {
        let mut registry = StepRegistry::new();
        assert!(registry.insert("click Submit"));
        assert!(!registry.insert("click Submit"));
        assert!(registry.insert("click submit"));
        assert_eq!(registry.len(), 2);
    }
}
