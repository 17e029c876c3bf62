use crate::rules::UnitContext;
use crate::rules::matchers::{Hit, Matcher, simple_name};
use crate::source::model::NodeKind;

/// Canonical attribute name: namespace and `Attribute` suffix removed.
fn canonical(name: &str) -> &str {
    let name = simple_name(name);
    match name.strip_suffix("Attribute") {
        Some(stem) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Returns the configured name `written` refers to, if any.
///
/// `DllImport`, `DllImportAttribute` and
/// `System.Runtime.InteropServices.DllImportAttribute` all refer to `DllImport`.
pub fn attribute_name_matches<'n>(written: &str, names: &'n [String]) -> Option<&'n str> {
    let written = canonical(written);
    names
        .iter()
        .find(|n| canonical(n).eq_ignore_ascii_case(written))
        .map(String::as_str)
}

/// Flags attributes whose name is in a configured set.
#[derive(Debug, Clone)]
pub struct AttributePresenceMatcher {
    names: Vec<String>,
}

impl AttributePresenceMatcher {
    pub fn new(names: &[String]) -> Self {
        Self {
            names: names.to_vec(),
        }
    }
}

impl Matcher for AttributePresenceMatcher {
    fn find(&self, cx: UnitContext<'_>) -> Vec<Hit> {
        let mut hits = Vec::new();
        // Attribute lists hang off declarations; the declaration names the subject.
        for decl in cx.unit.root.descendants() {
            for attr in decl.children_of(NodeKind::Attribute) {
                if let Some(name) = attribute_name_matches(attr.text(), &self.names) {
                    let subject = if decl.text().is_empty() {
                        attr.text()
                    } else {
                        decl.text()
                    };
                    hits.push(Hit::new(attr.line, subject, name));
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::model::{CompilationUnit, LoadedUnit, SyntaxNode};

    fn names() -> Vec<String> {
        vec!["ComVisible".to_string(), "WebMethod".to_string()]
    }

    #[test]
    fn suffix_and_namespace_are_ignored() {
        let n = names();
        assert_eq!(attribute_name_matches("ComVisible", &n), Some("ComVisible"));
        assert_eq!(attribute_name_matches("ComVisibleAttribute", &n), Some("ComVisible"));
        assert_eq!(
            attribute_name_matches("System.Web.Services.WebMethodAttribute", &n),
            Some("WebMethod")
        );
        assert_eq!(attribute_name_matches("Attribute", &n), None);
        assert_eq!(attribute_name_matches("Serializable", &n), None);
    }

    #[test]
    fn configured_name_may_carry_suffix() {
        let n = vec!["ServiceContractAttribute".to_string()];
        assert!(attribute_name_matches("ServiceContract", &n).is_some());
    }

    #[test]
    fn finds_attributes_on_any_declaration() {
        let u = LoadedUnit::lexical(CompilationUnit {
            path: "a.cs".into(),
            root: SyntaxNode::new(NodeKind::CompilationUnit, 1).with_child(
                SyntaxNode::new(NodeKind::ClassDecl, 3)
                    .with_text("Legacy")
                    .with_child(SyntaxNode::new(NodeKind::Attribute, 2).with_text("ComVisible"))
                    .with_child(
                        SyntaxNode::new(NodeKind::MethodDecl, 6)
                            .with_text("Ping")
                            .with_child(
                                SyntaxNode::new(NodeKind::Attribute, 5)
                                    .with_text("WebMethodAttribute"),
                            ),
                    ),
            ),
            directives: vec![],
        });

        let hits = AttributePresenceMatcher::new(&names()).find(UnitContext::new(&u));
        assert_eq!(
            hits,
            vec![
                Hit::new(2, "Legacy", "ComVisible"),
                Hit::new(5, "Ping", "WebMethod"),
            ]
        );
    }
}
