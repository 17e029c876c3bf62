use regex::Regex;

use crate::error::ConfigError;
use crate::rules::UnitContext;
use crate::rules::matchers::{Hit, Matcher};
use crate::source::model::NodeKind;

/// Applies compiled patterns to string-literal values.
///
/// A literal matching any safe pattern is skipped before the detection
/// patterns run. Each detection pattern that matches yields its own hit.
#[derive(Debug, Clone)]
pub struct LiteralPatternMatcher {
    patterns: Vec<(String, Regex)>,
    safe: Vec<Regex>,
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Regex {
        pattern: pattern.to_string(),
        source,
    })
}

impl LiteralPatternMatcher {
    /// `patterns` pairs a label (used as hit evidence) with a regular expression.
    pub fn new(patterns: &[(&str, &str)], safe: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            patterns: patterns
                .iter()
                .map(|(label, p)| Ok((label.to_string(), compile(p)?)))
                .collect::<Result<_, ConfigError>>()?,
            safe: safe.iter().map(|p| compile(p)).collect::<Result<_, _>>()?,
        })
    }

    fn is_safe(&self, value: &str) -> bool {
        self.safe.iter().any(|re| re.is_match(value))
    }
}

impl Matcher for LiteralPatternMatcher {
    fn find(&self, cx: UnitContext<'_>) -> Vec<Hit> {
        let mut hits = Vec::new();
        for node in cx.unit.root.descendants() {
            if node.kind != NodeKind::StringLiteral {
                continue;
            }
            let value = node.text();
            if value.is_empty() || self.is_safe(value) {
                continue;
            }
            for (label, re) in &self.patterns {
                if re.is_match(value) {
                    hits.push(Hit::new(node.line, value, label.as_str()));
                }
            }
        }
        hits
    }
}
