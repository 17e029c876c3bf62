use crate::rules::UnitContext;
use crate::rules::matchers::{Hit, Matcher};

/// Flags conditional-compilation directives that test configured symbols.
///
/// Only `#if` and `#elif` are inspected. A condition symbol matches when it
/// contains a configured token, ignoring case, so `NET4` matches both
/// `#if NET48` and `#if NET481_OR_GREATER`. Each symbol yields at most one hit.
#[derive(Debug, Clone)]
pub struct DirectiveScanMatcher {
    tokens: Vec<String>,
}

impl DirectiveScanMatcher {
    pub fn new(tokens: &[String]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_ascii_uppercase()).collect(),
        }
    }
}

fn condition(directive: &str) -> Option<&str> {
    let text = directive.trim_start().strip_prefix('#')?.trim_start();
    text.strip_prefix("elif")
        .or_else(|| text.strip_prefix("if"))
        .filter(|rest| rest.is_empty() || !rest.starts_with(|c: char| c.is_alphanumeric()))
}

impl Matcher for DirectiveScanMatcher {
    fn find(&self, cx: UnitContext<'_>) -> Vec<Hit> {
        let mut hits = Vec::new();
        for directive in &cx.unit.directives {
            let Some(cond) = condition(&directive.text) else {
                continue;
            };
            for symbol in cond
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .filter(|s| !s.is_empty())
            {
                let upper = symbol.to_ascii_uppercase();
                if self.tokens.iter().any(|t| upper.contains(t.as_str())) {
                    hits.push(Hit::new(directive.line, directive.text.trim(), symbol));
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;
    use crate::source::model::{CompilationUnit, Directive, LoadedUnit, NodeKind, SyntaxNode};

    fn unit(directives: &[(u32, &str)]) -> LoadedUnit {
        LoadedUnit::lexical(CompilationUnit {
            path: "a.cs".into(),
            root: SyntaxNode::new(NodeKind::CompilationUnit, 1),
            directives: directives
                .iter()
                .map(|(line, text)| Directive {
                    line: *line,
                    text: text.to_string(),
                })
                .collect(),
        })
    }

    fn matcher() -> DirectiveScanMatcher {
        DirectiveScanMatcher::new(&["WINDOWS".to_string(), "WIN32".to_string()])
    }

    #[test]
    fn flags_if_and_elif_conditions() {
        let u = unit(&[
            (1, "#if WINDOWS"),
            (4, "#elif win32 && !DEBUG"),
            (8, "#endif"),
            (9, "#define WINDOWS"),
        ]);
        let hits = matcher().find(UnitContext::new(&u));
        let lines: Vec<u32> = hits.iter().map(|h| h.line).collect();
        assert_eq!(lines, vec![1, 4]);
        assert_eq!(hits[1].evidence, "win32");
    }

    #[test]
    fn tokens_match_inside_longer_symbols() {
        let u = unit(&[
            (1, "#if WIN32_COMPAT"),
            (2, "#if WINDOWS10_0_17763_0_OR_GREATER"),
            (3, "#if DEBUG"),
        ]);
        let hits = matcher().find(UnitContext::new(&u));
        let evidence: Vec<&str> = hits.iter().map(|h| h.evidence.as_str()).collect();
        assert_eq!(
            evidence,
            vec!["WIN32_COMPAT", "WINDOWS10_0_17763_0_OR_GREATER"]
        );
    }

    #[test]
    fn default_tokens_cover_versioned_framework_symbols() {
        let matcher = DirectiveScanMatcher::new(&CatalogConfig::default().directive_tokens);
        let u = unit(&[
            (1, "#if NET48_OR_GREATER"),
            (2, "#if WINDOWS10_0_17763_0_OR_GREATER"),
            (3, "#if NET481"),
            (4, "#if NET8_0 || DEBUG"),
        ]);
        let lines: Vec<u32> = matcher
            .find(UnitContext::new(&u))
            .iter()
            .map(|h| h.line)
            .collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn non_conditional_directives_are_ignored() {
        let u = unit(&[(1, "#ifdef_like WINDOWS"), (2, "#region WIN32 interop")]);
        assert!(matcher().find(UnitContext::new(&u)).is_empty());
    }

    #[test]
    fn each_token_in_one_directive_is_a_hit() {
        let u = unit(&[(3, "# if WINDOWS || WIN32")]);
        assert_eq!(matcher().find(UnitContext::new(&u)).len(), 2);
    }
}
