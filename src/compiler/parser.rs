//! Groups raw input lines into named scenarios.
//!
//! A line starting with `test scenario` (any case) opens a scenario; every
//! following non-blank line is one of its steps until the next marker.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{Scenario, ScenarioMap};

/// Marker that opens a scenario, compared case-insensitively
pub const SCENARIO_MARKER: &str = "test scenario";

static OPEN_TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"open\s+(\S+)").expect("valid regex"));

/// Output of parsing one input file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedInput {
    /// Scenarios in declaration order
    pub scenarios: ScenarioMap,
    /// Address from the first `open <token>` line, if any
    pub target_app: Option<String>,
}

impl ParsedInput {
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Total number of steps across all scenarios
    pub fn step_count(&self) -> usize {
        self.scenarios.values().map(Vec::len).sum()
    }

    pub fn to_scenarios(&self) -> Vec<Scenario> {
        self.scenarios
            .iter()
            .map(|(name, steps)| Scenario {
                name: name.clone(),
                steps: steps.clone(),
            })
            .collect()
    }
}

/// Parse raw lines into scenarios
pub fn parse_scenarios<S: AsRef<str>>(lines: &[S]) -> ParsedInput {
    let mut parsed = ParsedInput::default();
    let mut current: Option<String> = None;

    for raw in lines {
        let line = raw.as_ref().trim();

        if parsed.target_app.is_none() {
            parsed.target_app = extract_open_target(line);
        }

        if let Some(name) = scenario_name(line) {
            // Re-declaring a name starts it over but keeps its position
            parsed.scenarios.insert(name.clone(), Vec::new());
            current = Some(name);
        } else if let Some(name) = &current {
            if !line.is_empty() {
                if let Some(steps) = parsed.scenarios.get_mut(name) {
                    steps.push(line.to_string());
                }
            }
        }
    }

    tracing::debug!(
        scenarios = parsed.scenarios.len(),
        steps = parsed.step_count(),
        target_app = parsed.target_app.as_deref().unwrap_or("-"),
        "parsed scenarios"
    );
    parsed
}

/// Return the scenario name if `line` is a scenario marker line
pub fn scenario_name(line: &str) -> Option<String> {
    let line = line.trim();
    let prefix = line.get(..SCENARIO_MARKER.len())?;
    if !prefix.eq_ignore_ascii_case(SCENARIO_MARKER) {
        return None;
    }
    let rest = line[SCENARIO_MARKER.len()..].trim_start();
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    Some(rest.trim().to_string())
}

/// The token following the first `open` in `line`
pub fn extract_open_target(line: &str) -> Option<String> {
    OPEN_TARGET
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_groups_steps_under_markers() {
        let lines = [
            "preamble ignored",
            "Test Scenario Login",
            "open localhost:3000",
            "",
            "  click Login  ",
            "test scenario Logout",
            "click Logout",
        ];
        let parsed = parse_scenarios(&lines);

        let names: Vec<_> = parsed.scenarios.keys().cloned().collect();
        assert_eq!(names, vec!["Login", "Logout"]);
        assert_eq!(parsed.scenarios["Login"], vec!["open localhost:3000", "click Login"]);
        assert_eq!(parsed.scenarios["Logout"], vec!["click Logout"]);
        assert_eq!(parsed.target_app.as_deref(), Some("localhost:3000"));
    }

    #[test]
    fn test_no_marker_no_scenarios() {
        let parsed = parse_scenarios(&["open localhost:3000", "click Submit"]);
        assert!(parsed.is_empty());
        // The address is still picked up
        assert_eq!(parsed.target_app.as_deref(), Some("localhost:3000"));
    }

    #[test]
    fn test_redeclared_name_overwrites_in_place() {
        let lines = [
            "test scenario A",
            "step one",
            "test scenario B",
            "step two",
            "TEST SCENARIO A",
            "step three",
        ];
        let parsed = parse_scenarios(&lines);
        let names: Vec<_> = parsed.scenarios.keys().cloned().collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(parsed.scenarios["A"], vec!["step three"]);
    }

    #[test]
    fn test_only_first_open_target_counts() {
        let parsed = parse_scenarios(&[
            "test scenario Nav",
            "open http://first.example",
            "open http://second.example",
        ]);
        assert_eq!(parsed.target_app.as_deref(), Some("http://first.example"));
    }

    #[test]
    fn test_scenario_name_variants() {
        assert_eq!(scenario_name("test scenario Login").as_deref(), Some("Login"));
        assert_eq!(scenario_name("Test Scenario: Add item ").as_deref(), Some("Add item"));
        assert_eq!(scenario_name("   TEST SCENARIO").as_deref(), Some(""));
        assert_eq!(scenario_name("a test scenario"), None);
        assert_eq!(scenario_name("test"), None);
        assert_eq!(scenario_name("tést scenario x"), None);
    }

    #[test]
    fn test_to_scenarios_keeps_order() {
        let parsed = parse_scenarios(&["test scenario Z", "a", "test scenario A", "b"]);
        let scenarios = parsed.to_scenarios();
        assert_eq!(scenarios[0].name, "Z");
        assert_eq!(scenarios[1].steps, vec!["b"]);
        assert_eq!(parsed.step_count(), 2);
    }
}
