//! Reusable detection strategies.
//!
//! A matcher inspects one compilation unit and returns zero or more [`Hit`]s.
//! Hits are never deduplicated: two matchers (or two patterns of one matcher)
//! that fire on the same node produce two hits, and each becomes a finding.

mod attribute;
mod directive;
mod inheritance;
mod literal;
mod namespace;
mod type_identity;

pub use attribute::{AttributePresenceMatcher, attribute_name_matches};
pub use directive::DirectiveScanMatcher;
pub use inheritance::InheritanceChainMatcher;
pub use literal::LiteralPatternMatcher;
pub use namespace::NamespacePrefixMatcher;
pub use type_identity::TypeIdentityMatcher;

use async_trait::async_trait;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

use crate::error::RuleError;
use crate::finding::AnalyzerCategory;
use crate::rules::{Rule, RuleMeta, RuleOutcome, UnitContext, scan_units};
use crate::source::model::LoadedModel;

/// Evidence of one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub line: u32,
    /// What was matched on, e.g. a declaration or a literal value.
    pub subject: String,
    /// Why it matched, e.g. the configured name or pattern it hit.
    pub evidence: String,
}

impl Hit {
    pub fn new(line: u32, subject: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self {
            line,
            subject: subject.into(),
            evidence: evidence.into(),
        }
    }
}

pub trait Matcher: Send + Sync + Debug {
    fn find(&self, cx: UnitContext<'_>) -> Vec<Hit>;
}

/// A rule that turns every hit of one matcher into one finding.
///
/// `message` and `recommendation` may reference `{subject}` and `{evidence}`.
#[derive(Debug)]
pub struct MatcherRule {
    meta: RuleMeta,
    matcher: Box<dyn Matcher>,
    message: String,
    recommendation: String,
}

impl MatcherRule {
    pub fn new(
        meta: RuleMeta,
        matcher: impl Matcher + 'static,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            meta,
            matcher: Box::new(matcher),
            message: message.into(),
            recommendation: recommendation.into(),
        }
    }

    pub fn meta(&self) -> &RuleMeta {
        &self.meta
    }
}

fn render(template: &str, hit: &Hit) -> String {
    template
        .replace("{subject}", &hit.subject)
        .replace("{evidence}", &hit.evidence)
}

#[async_trait]
impl Rule for MatcherRule {
    fn id(&self) -> &str {
        self.meta.id
    }

    fn name(&self) -> &str {
        self.meta.name
    }

    fn category(&self) -> AnalyzerCategory {
        self.meta.category
    }

    async fn analyze(
        &self,
        model: &LoadedModel,
        cancel: &CancellationToken,
    ) -> Result<RuleOutcome, RuleError> {
        scan_units(model, cancel, |cx, out| {
            for hit in self.matcher.find(cx) {
                out.push(self.meta.finding(
                    cx.path(),
                    hit.line,
                    render(&self.message, &hit),
                    render(&self.recommendation, &hit),
                ));
            }
            Ok(())
        })
    }
}

/// Last dotted segment with generic arguments removed: `A.B.List<int>` → `List`.
pub(crate) fn simple_name(name: &str) -> &str {
    let name = name.split('<').next().unwrap_or(name).trim();
    name.rsplit('.').next().unwrap_or(name)
}

/// Segment-aware, case-insensitive namespace prefix test.
///
/// `System.Web` matches `System.Web` and `System.Web.UI` but not `System.WebSockets`.
pub(crate) fn has_namespace_prefix(path: &str, prefix: &str) -> bool {
    let path = path.trim();
    if path.len() < prefix.len() || !path.is_char_boundary(prefix.len()) {
        return false;
    }
    let (head, rest) = path.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix) && (rest.is_empty() || rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;
    use crate::source::model::{CompilationUnit, LoadedUnit, NodeKind, SyntaxNode};

    #[derive(Debug)]
    struct EveryLiteral;

    impl Matcher for EveryLiteral {
        fn find(&self, cx: UnitContext<'_>) -> Vec<Hit> {
            cx.unit
                .root
                .descendants()
                .filter(|n| n.kind == NodeKind::StringLiteral)
                .map(|n| Hit::new(n.line, n.text(), "literal"))
                .collect()
        }
    }

    #[test]
    fn simple_name_strips_namespace_and_generics() {
        assert_eq!(simple_name("System.Collections.Generic.List<int>"), "List");
        assert_eq!(simple_name("Registry"), "Registry");
    }

    #[test]
    fn namespace_prefix_is_segment_aware() {
        assert!(has_namespace_prefix("System.Web", "System.Web"));
        assert!(has_namespace_prefix("system.web.ui", "System.Web"));
        assert!(!has_namespace_prefix("System.WebSockets", "System.Web"));
        assert!(!has_namespace_prefix("System", "System.Web"));
    }

    #[tokio::test]
    async fn matcher_rule_renders_templates_per_hit() {
        let rule = MatcherRule::new(
            RuleMeta {
                id: "T100",
                name: "literal",
                category: AnalyzerCategory::General,
                severity: Severity::Low,
            },
            EveryLiteral,
            "Literal '{subject}' ({evidence})",
            "Review '{subject}'",
        );
        let model = LoadedModel {
            source_id: "s".into(),
            units: vec![LoadedUnit::lexical(CompilationUnit {
                path: "a.cs".into(),
                root: SyntaxNode::new(NodeKind::CompilationUnit, 1)
                    .with_child(SyntaxNode::new(NodeKind::StringLiteral, 2).with_text("x"))
                    .with_child(SyntaxNode::new(NodeKind::StringLiteral, 3).with_text("x")),
                directives: vec![],
            })],
            packages: vec![],
        };

        let outcome = rule.analyze(&model, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.findings.len(), 2);
        assert_eq!(outcome.findings[0].message(), "Literal 'x' (literal)");
        assert_eq!(outcome.findings[1].line(), 3);
        assert_eq!(outcome.findings[1].recommendation(), "Review 'x'");
    }
}
