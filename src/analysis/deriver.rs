//! Suggestion derivation from tool output markers.
//!
//! Each rule ties a tool family to a set of marker substrings and one
//! canonical suggestion sentence.

use crate::models::{ResultSet, Tool};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One marker-table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRule {
    /// Tool family the rule applies to.
    pub family: String,
    /// Case-sensitive substrings; any match fires the rule.
    pub markers: Vec<String>,
    /// Suggestion emitted when the rule fires.
    pub suggestion: String,
}

impl MarkerRule {
    pub fn new(family: &str, markers: &[&str], suggestion: &str) -> Self {
        Self {
            family: family.to_string(),
            markers: markers.iter().map(|m| m.to_string()).collect(),
            suggestion: suggestion.to_string(),
        }
    }

    fn fires_on(&self, text: &str) -> bool {
        self.markers.iter().any(|marker| text.contains(marker.as_str()))
    }
}

/// The built-in marker table.
pub fn default_marker_rules() -> Vec<MarkerRule> {
    vec![
        MarkerRule::new(
            "style-checker",
            &["E"],
            "fix style violations flagged by the style checker",
        ),
        MarkerRule::new(
            "type-checker",
            &["error"],
            "resolve type errors reported by the type checker",
        ),
        MarkerRule::new("security-scanner", &["issue"], "address security findings"),
        MarkerRule::new(
            "dependency-auditor",
            &["vulnerability"],
            "update vulnerable dependencies",
        ),
        MarkerRule::new(
            "complexity-analyzer",
            &["Complexity"],
            "reduce cyclomatic complexity in flagged functions",
        ),
        MarkerRule::new(
            "linter",
            &[": C", ": W", ": E", ": R"],
            "improve code quality issues reported by the linter",
        ),
        MarkerRule::new(
            "formatter",
            &["would reformat"],
            "run the code formatter over the file",
        ),
        MarkerRule::new(
            "import-sorter",
            &["ERROR"],
            "sort imports into the configured order",
        ),
        MarkerRule::new(
            "docstring-checker",
            &["D1", "D2", "D3", "D4"],
            "add or fix docstrings for public modules, classes and functions",
        ),
        MarkerRule::new(
            "quality-gate",
            &["\"ERROR\""],
            "fix the conditions failing the quality gate",
        ),
    ]
}

/// Turns a result set into sorted, deduplicated suggestions.
#[derive(Debug, Clone)]
pub struct SuggestionDeriver {
    rules_by_family: HashMap<String, Vec<MarkerRule>>,
    /// Tool name -> family, for tools whose family differs from their name.
    families: HashMap<String, String>,
}

impl Default for SuggestionDeriver {
    fn default() -> Self {
        Self::new(default_marker_rules())
    }
}

impl SuggestionDeriver {
    pub fn new(rules: Vec<MarkerRule>) -> Self {
        let mut rules_by_family: HashMap<String, Vec<MarkerRule>> = HashMap::new();
        for rule in rules {
            rules_by_family
                .entry(rule.family.clone())
                .or_default()
                .push(rule);
        }

        Self {
            rules_by_family,
            families: HashMap::new(),
        }
    }

    /// Register the families of the configured tools.
    pub fn with_tools(mut self, tools: &[Tool]) -> Self {
        for tool in tools {
            self.families
                .insert(tool.name.clone(), tool.family().to_string());
        }
        self
    }

    fn family_of<'a>(&'a self, tool: &'a str) -> &'a str {
        self.families.get(tool).map(String::as_str).unwrap_or(tool)
    }

    /// Scan every outcome for markers of its tool's family.
    pub fn derive(&self, results: &ResultSet) -> BTreeSet<String> {
        let mut suggestions = BTreeSet::new();

        for (tool, outcome) in results.iter() {
            let Some(text) = outcome.scannable_text() else {
                continue;
            };
            let Some(rules) = self.rules_by_family.get(self.family_of(tool)) else {
                continue;
            };

            for rule in rules.iter().filter(|rule| rule.fires_on(text)) {
                suggestions.insert(rule.suggestion.clone());
            }
        }

        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Outcome;

    fn success(stdout: &str) -> Outcome {
        Outcome::Success {
            stdout: stdout.to_string(),
        }
    }

    #[test]
    fn test_style_checker_marker() {
        let mut results = ResultSet::new();
        results.insert("style-checker", success("E501 line too long"));

        let derived = SuggestionDeriver::default().derive(&results);
        assert_eq!(
            derived.into_iter().collect::<Vec<_>>(),
            vec!["fix style violations flagged by the style checker"]
        );
    }

    #[test]
    fn test_no_marker_yields_nothing() {
        let mut results = ResultSet::new();
        results.insert("style-checker", success("all clean"));

        assert!(SuggestionDeriver::default().derive(&results).is_empty());
    }

    #[test]
    fn test_missing_and_timed_out_tools_contribute_nothing() {
        let mut results = ResultSet::new();
        results.insert("style-checker", Outcome::ToolNotFound);
        results.insert("type-checker", Outcome::TimedOut);

        assert!(SuggestionDeriver::default().derive(&results).is_empty());
    }

    #[test]
    fn test_failed_output_is_scanned() {
        let mut results = ResultSet::new();
        results.insert(
            "type-checker",
            Outcome::ExecutionFailed {
                detail: "app.py:3: error: Incompatible types".to_string(),
            },
        );

        let derived = SuggestionDeriver::default().derive(&results);
        assert!(derived.contains("resolve type errors reported by the type checker"));
    }

    #[test]
    fn test_family_lookup_through_configured_tools() {
        let tools = vec![
            Tool::new("flake8", ["flake8"]).with_family("style-checker"),
            Tool::new("bandit", ["bandit"]).with_family("security-scanner"),
        ];
        let mut results = ResultSet::new();
        results.insert("flake8", success("app.py:1:80: E501 line too long"));
        results.insert(
            "bandit",
            success(">> Issue: [B101] assert used\nTotal issues (by severity):\n\tLow: 1"),
        );

        let derived = SuggestionDeriver::default().with_tools(&tools).derive(&results);
        let derived: Vec<_> = derived.into_iter().collect();

        assert_eq!(
            derived,
            vec![
                "address security findings",
                "fix style violations flagged by the style checker",
            ]
        );
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        let mut results = ResultSet::new();
        results.insert("complexity-analyzer", success("complexity is fine"));
        results.insert("security-scanner", success(">> Issue: [B101] assert used"));

        assert!(SuggestionDeriver::default().derive(&results).is_empty());
    }

    #[test]
    fn test_derive_is_idempotent_and_deduplicated() {
        let rules = vec![
            MarkerRule::new("a", &["x"], "same suggestion"),
            MarkerRule::new("b", &["y"], "same suggestion"),
        ];
        let deriver = SuggestionDeriver::new(rules);
        let mut results = ResultSet::new();
        results.insert("a", success("x"));
        results.insert("b", success("y"));

        let first = deriver.derive(&results);
        let second = deriver.derive(&results);
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_unknown_family_never_matches() {
        let mut results = ResultSet::new();
        results.insert("custom-tool", success("E error issue vulnerability"));

        assert!(SuggestionDeriver::default().derive(&results).is_empty());
    }
}
