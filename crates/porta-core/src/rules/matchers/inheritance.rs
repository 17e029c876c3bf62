use std::collections::{BTreeSet, VecDeque};

use crate::rules::UnitContext;
use crate::rules::matchers::{Hit, Matcher, simple_name};
use crate::source::model::{NodeKind, SymbolResolver, SyntaxNode};

/// Upper bound on ancestors visited per declaration.
const MAX_ANCESTORS: usize = 256;

/// Flags type declarations with a configured ancestor anywhere in their
/// base-type chain or interface set.
///
/// The resolver supplies the chain beyond what the declaration spells out.
/// Without one, only the `BaseType` entries written on the declaration are
/// inspected.
#[derive(Debug, Clone)]
pub struct InheritanceChainMatcher {
    ancestors: Vec<String>,
}

impl InheritanceChainMatcher {
    pub fn new(ancestors: &[String]) -> Self {
        Self {
            ancestors: ancestors.to_vec(),
        }
    }

    /// A qualified candidate must match a configured name exactly; a simple
    /// candidate matches on the configured name's last segment.
    fn configured(&self, candidate: &str) -> Option<&str> {
        let candidate = candidate.split('<').next().unwrap_or(candidate).trim();
        self.ancestors
            .iter()
            .find(|a| {
                if candidate.contains('.') {
                    a.eq_ignore_ascii_case(candidate)
                } else {
                    simple_name(a) == candidate
                }
            })
            .map(String::as_str)
    }

    fn check_declaration(
        &self,
        decl: &SyntaxNode,
        resolver: Option<&dyn SymbolResolver>,
        hits: &mut Vec<Hit>,
    ) {
        let name = decl.text().trim();
        let mut queue: VecDeque<String> = decl
            .children_of(NodeKind::BaseType)
            .map(|b| b.text().trim().to_string())
            .collect();
        if let Some(r) = resolver {
            queue.extend(r.base_type(name));
            queue.extend(r.interfaces(name));
        }

        let mut seen = BTreeSet::new();
        let mut reported = BTreeSet::new();
        while let Some(ancestor) = queue.pop_front() {
            if seen.len() >= MAX_ANCESTORS || !seen.insert(ancestor.clone()) {
                continue;
            }
            if let Some(configured) = self.configured(&ancestor) {
                if reported.insert(configured.to_string()) {
                    hits.push(Hit::new(decl.line, name, configured));
                }
            }
            if let Some(r) = resolver {
                queue.extend(r.base_type(&ancestor));
                queue.extend(r.interfaces(&ancestor));
            }
        }
    }
}

impl Matcher for InheritanceChainMatcher {
    fn find(&self, cx: UnitContext<'_>) -> Vec<Hit> {
        let mut hits = Vec::new();
        for node in cx.unit.root.descendants() {
            if matches!(node.kind, NodeKind::ClassDecl | NodeKind::InterfaceDecl) {
                self.check_declaration(node, cx.resolver, &mut hits);
            }
        }
        hits
    }
}
