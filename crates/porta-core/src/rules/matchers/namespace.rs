use crate::rules::UnitContext;
use crate::rules::matchers::{Hit, Matcher, has_namespace_prefix};
use crate::source::model::{NodeKind, SyntaxNode};
use crate::source::visit::{Visitor, walk};

/// Flags `using` directives and qualified names under configured namespaces.
#[derive(Debug, Clone)]
pub struct NamespacePrefixMatcher {
    prefixes: Vec<String>,
}

impl NamespacePrefixMatcher {
    pub fn new(prefixes: &[String]) -> Self {
        Self {
            prefixes: prefixes.to_vec(),
        }
    }

    fn matched_prefix(&self, path: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|p| has_namespace_prefix(path, p))
            .map(String::as_str)
    }
}

/// `using static A.B;` and `using Alias = A.B;` both name `A.B`.
fn imported_path(text: &str) -> &str {
    let text = text.trim();
    let text = text.rsplit('=').next().unwrap_or(text).trim();
    text.strip_prefix("static ").unwrap_or(text).trim()
}

struct Scan<'m> {
    matcher: &'m NamespacePrefixMatcher,
    hits: Vec<Hit>,
}

impl Visitor for Scan<'_> {
    fn enter(&mut self, node: &SyntaxNode, _depth: usize) -> bool {
        let path = match node.kind {
            NodeKind::Using => imported_path(node.text()),
            NodeKind::QualifiedName => node.text().trim(),
            _ => return true,
        };
        match self.matcher.matched_prefix(path) {
            Some(prefix) => {
                self.hits.push(Hit::new(node.line, path, prefix));
                // The parts of a matched name are the same reference.
                false
            }
            None => true,
        }
    }
}

impl Matcher for NamespacePrefixMatcher {
    fn find(&self, cx: UnitContext<'_>) -> Vec<Hit> {
        let mut scan = Scan {
            matcher: self,
            hits: Vec::new(),
        };
        walk(&cx.unit.root, &mut scan);
        scan.hits
    }
}
