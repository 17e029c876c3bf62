use crate::config::TypeRef;
use crate::rules::UnitContext;
use crate::rules::matchers::{Hit, Matcher, simple_name};
use crate::source::model::{NodeKind, SymbolInfo, SyntaxNode};
use crate::source::visit::{Visitor, walk};

/// Flags references to configured types.
///
/// With a resolved symbol the match is exact on `(namespace, type)`: a
/// user-defined `Registry` class is not confused with `Microsoft.Win32.Registry`.
/// Without one, identifier text is compared against the configured simple names.
#[derive(Debug, Clone)]
pub struct TypeIdentityMatcher {
    types: Vec<TypeRef>,
}

impl TypeIdentityMatcher {
    pub fn new(types: &[TypeRef]) -> Self {
        Self {
            types: types.to_vec(),
        }
    }

    fn semantic_match(&self, symbol: &SymbolInfo) -> Option<&TypeRef> {
        self.types.iter().find(|t| {
            t.name == symbol.declared_type
                && t.namespace.eq_ignore_ascii_case(&symbol.containing_namespace)
        })
    }

    fn lexical_match(&self, node: &SyntaxNode) -> Option<&TypeRef> {
        let text = node.text().trim();
        match node.kind {
            NodeKind::Identifier | NodeKind::ObjectCreation => {
                let name = simple_name(text);
                self.types.iter().find(|t| t.name == name)
            }
            // `Registry.LocalMachine.OpenSubKey`: any segment may be the type.
            _ => {
                let path = text.split('<').next().unwrap_or(text);
                self.types
                    .iter()
                    .find(|t| path.split('.').any(|segment| segment.trim() == t.name))
            }
        }
    }
}

struct Scan<'m, 'a> {
    matcher: &'m TypeIdentityMatcher,
    cx: UnitContext<'a>,
    hits: Vec<Hit>,
}

impl Visitor for Scan<'_, '_> {
    fn enter(&mut self, node: &SyntaxNode, _depth: usize) -> bool {
        if !matches!(
            node.kind,
            NodeKind::Identifier
                | NodeKind::QualifiedName
                | NodeKind::ObjectCreation
                | NodeKind::MemberAccess
        ) {
            return true;
        }

        let symbol = self.cx.resolver.and_then(|r| r.resolve(node));
        let matched = match &symbol {
            Some(symbol) => self.matcher.semantic_match(symbol),
            None => self.matcher.lexical_match(node),
        };

        match matched {
            Some(t) => {
                self.hits.push(Hit::new(
                    node.line,
                    node.text().trim(),
                    format!("{}.{}", t.namespace, t.name),
                ));
                false
            }
            None => true,
        }
    }
}

impl Matcher for TypeIdentityMatcher {
    fn find(&self, cx: UnitContext<'_>) -> Vec<Hit> {
        let mut scan = Scan {
            matcher: self,
            cx,
            hits: Vec::new(),
        };
        walk(&cx.unit.root, &mut scan);
        scan.hits
    }
}
