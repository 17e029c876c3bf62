//! Contract between the engine and an external source model provider.
//!
//! The provider owns parsing and semantic resolution. The engine only
//! consumes the shapes defined here:
//!
//! - an enumeration of compilation units (`UnitHandle`)
//! - per unit, a location-bearing syntax tree plus directive trivia
//! - per unit, an optional `SymbolResolver`
//!
//! A missing resolver, or a resolver that knows nothing about a node, is a
//! normal condition. Matchers fall back to lexical comparison.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::SourceError;

/// Identifier of a node inside one compilation unit, assigned by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Node discriminator of the tagged-variant tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    CompilationUnit,
    Namespace,
    /// Import directive; `text` is the imported dotted path.
    Using,
    /// `text` is the type name; base types appear as `BaseType` children.
    ClassDecl,
    InterfaceDecl,
    /// `text` is the method name; attributes appear as `Attribute` children.
    MethodDecl,
    /// `text` is the base type or interface name as written.
    BaseType,
    /// `text` is the attribute name as written; arguments are children.
    Attribute,
    /// Dotted name such as `Microsoft.Win32.Registry`.
    QualifiedName,
    Identifier,
    /// `text` is the full member access expression, e.g. `Registry.LocalMachine`.
    MemberAccess,
    /// `text` is the invoked member name, e.g. `AddSession`.
    Invocation,
    /// `text` is the created type name.
    ObjectCreation,
    /// `text` is the unescaped literal value.
    StringLiteral,
    #[serde(other)]
    Other,
}

/// One node of a compilation unit's syntax tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// 1-based source line.
    #[serde(default = "first_line")]
    pub line: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SyntaxNode>,
}

fn first_line() -> u32 {
    1
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, line: u32) -> Self {
        Self {
            kind,
            id: None,
            text: None,
            line,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(NodeId(id));
        self
    }

    pub fn with_child(mut self, child: SyntaxNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = SyntaxNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Children of the given kind, in source order.
    pub fn children_of(&self, kind: NodeKind) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A conditional-compilation directive, e.g. `#if WINDOWS && !NETCOREAPP`.
///
/// Directives are trivia: they are carried beside the tree, not inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub line: u32,
    pub text: String,
}

/// One parsed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub path: String,
    pub root: SyntaxNode,
    #[serde(default)]
    pub directives: Vec<Directive>,
}

/// Semantic facts the provider can attach to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Simple name of the declared or containing type, e.g. `Registry`.
    pub declared_type: String,
    /// Namespace of that type, e.g. `Microsoft.Win32`.
    pub containing_namespace: String,
}

impl SymbolInfo {
    pub fn qualified_type(&self) -> String {
        if self.containing_namespace.is_empty() {
            self.declared_type.clone()
        } else {
            format!("{}.{}", self.containing_namespace, self.declared_type)
        }
    }
}

/// Optional semantic capability of a compilation unit.
pub trait SymbolResolver: Send + Sync {
    fn resolve(&self, node: &SyntaxNode) -> Option<SymbolInfo>;

    /// Direct base type of `type_name`, if known.
    fn base_type(&self, _type_name: &str) -> Option<String> {
        None
    }

    /// Interfaces directly implemented by `type_name`.
    fn interfaces(&self, _type_name: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Handle returned by enumeration; resolved to a unit by `SourceModel::load`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitHandle {
    pub path: String,
}

/// A unit plus its optional resolver, as handed to rules.
#[derive(Clone)]
pub struct LoadedUnit {
    pub unit: CompilationUnit,
    pub resolver: Option<Arc<dyn SymbolResolver>>,
}

impl LoadedUnit {
    pub fn lexical(unit: CompilationUnit) -> Self {
        Self {
            unit,
            resolver: None,
        }
    }
}

impl std::fmt::Debug for LoadedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedUnit")
            .field("path", &self.unit.path)
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

/// A package reference declared by a project (name and optional version).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageReference {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Project file declaring the reference.
    pub declared_in: String,
    #[serde(default = "first_line")]
    pub line: u32,
}

/// External source model provider.
pub trait SourceModel: Send + Sync {
    /// Identifier of the analyzed source, e.g. a solution path.
    fn source_id(&self) -> &str;

    /// Enumerate compilation units. Failure here is fatal for the run.
    fn enumerate(&self) -> Result<Vec<UnitHandle>, SourceError>;

    /// Load one unit. Failure skips the unit only.
    fn load(&self, handle: &UnitHandle) -> Result<LoadedUnit, SourceError>;

    fn package_references(&self) -> Vec<PackageReference> {
        Vec::new()
    }
}

/// Everything the engine managed to load, shared read-only by all rules.
#[derive(Debug, Clone, Default)]
pub struct LoadedModel {
    pub source_id: String,
    pub units: Vec<LoadedUnit>,
    pub packages: Vec<PackageReference>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> SyntaxNode {
        SyntaxNode::new(NodeKind::CompilationUnit, 1)
            .with_child(SyntaxNode::new(NodeKind::Using, 1).with_text("System.IO"))
            .with_child(
                SyntaxNode::new(NodeKind::ClassDecl, 3)
                    .with_text("Program")
                    .with_child(SyntaxNode::new(NodeKind::MethodDecl, 5).with_text("Main")),
            )
    }

    #[test]
    fn descendants_are_pre_order() {
        let root = tree();
        let kinds: Vec<NodeKind> = root.descendants().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::CompilationUnit,
                NodeKind::Using,
                NodeKind::ClassDecl,
                NodeKind::MethodDecl,
            ]
        );
    }

    #[test]
    fn unknown_kind_deserializes_as_other() {
        let node: SyntaxNode =
            serde_json::from_str(r#"{"kind":"lambda_expression","line":4}"#).unwrap();
        assert_eq!(node.kind, NodeKind::Other);
        assert_eq!(node.line, 4);
    }

    #[test]
    fn missing_line_defaults_to_one() {
        let node: SyntaxNode = serde_json::from_str(r#"{"kind":"identifier","text":"x"}"#).unwrap();
        assert_eq!(node.line, 1);
        assert_eq!(node.text(), "x");
    }

    #[test]
    fn qualified_type_joins_namespace() {
        let s = SymbolInfo {
            declared_type: "Registry".into(),
            containing_namespace: "Microsoft.Win32".into(),
        };
        assert_eq!(s.qualified_type(), "Microsoft.Win32.Registry");
    }
}
