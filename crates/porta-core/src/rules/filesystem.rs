//! Filesystem portability rules (FS0xx).

use crate::config::CatalogConfig;
use crate::error::ConfigError;
use crate::finding::{AnalyzerCategory, Severity};
use crate::rules::RuleMeta;
use crate::rules::matchers::{LiteralPatternMatcher, MatcherRule};

pub const ABSOLUTE_PATH: RuleMeta = RuleMeta {
    id: "FS001",
    name: "Hardcoded absolute path",
    category: AnalyzerCategory::Filesystem,
    severity: Severity::High,
};

pub const UNC_PATH: RuleMeta = RuleMeta {
    id: "FS002",
    name: "Hardcoded UNC path",
    category: AnalyzerCategory::Filesystem,
    severity: Severity::High,
};

pub const ENVIRONMENT_TOKEN: RuleMeta = RuleMeta {
    id: "FS003",
    name: "Windows environment variable token",
    category: AnalyzerCategory::Filesystem,
    severity: Severity::Medium,
};

pub const BACKSLASH_SEPARATOR: RuleMeta = RuleMeta {
    id: "FS004",
    name: "Backslash path separator",
    category: AnalyzerCategory::Filesystem,
    severity: Severity::Low,
};

pub fn absolute_path_rule(config: &CatalogConfig) -> Result<MatcherRule, ConfigError> {
    let p = &config.literals;
    Ok(MatcherRule::new(
        ABSOLUTE_PATH,
        LiteralPatternMatcher::new(
            &[("drive-letter path", p.absolute_path.as_str())],
            &p.safe_paths,
        )?,
        "Hardcoded absolute path \"{subject}\"",
        "Build the path from configuration or a well-known base directory using Path.Combine.",
    ))
}

pub fn unc_path_rule(config: &CatalogConfig) -> Result<MatcherRule, ConfigError> {
    let p = &config.literals;
    Ok(MatcherRule::new(
        UNC_PATH,
        LiteralPatternMatcher::new(&[("UNC share", p.unc_path.as_str())], &p.safe_paths)?,
        "Hardcoded UNC path \"{subject}\"",
        "Move the share location into configuration; UNC paths do not resolve outside Windows.",
    ))
}

/// `%APPDATA%`, `%ProgramFiles(x86)%`, ... built from the configured names.
fn environment_pattern(names: &[String]) -> String {
    let alternatives: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
    format!("(?i)%({})%", alternatives.join("|"))
}

pub fn environment_token_rule(config: &CatalogConfig) -> Result<MatcherRule, ConfigError> {
    let pattern = environment_pattern(&config.windows_env_vars);
    Ok(MatcherRule::new(
        ENVIRONMENT_TOKEN,
        LiteralPatternMatcher::new(
            &[("Windows environment token", pattern.as_str())],
            &config.literals.safe_paths,
        )?,
        "Windows-style environment variable token in \"{subject}\"",
        "Use Environment.GetFolderPath or Environment.GetEnvironmentVariable instead of \
         %VAR% expansion.",
    ))
}

pub fn backslash_separator_rule(config: &CatalogConfig) -> Result<MatcherRule, ConfigError> {
    let p = &config.literals;
    Ok(MatcherRule::new(
        BACKSLASH_SEPARATOR,
        LiteralPatternMatcher::new(
            &[("backslash separator", p.relative_backslash_path.as_str())],
            &p.safe_paths,
        )?,
        "Path \"{subject}\" uses '\\' as a separator",
        "Use Path.Combine or '/' so the path resolves on every platform.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;
    use crate::source::model::{CompilationUnit, LoadedModel, LoadedUnit, NodeKind, SyntaxNode};
    use tokio_util::sync::CancellationToken;

    fn model(values: &[&str]) -> LoadedModel {
        LoadedModel {
            source_id: "s".into(),
            units: vec![LoadedUnit::lexical(CompilationUnit {
                path: "Paths.cs".into(),
                root: SyntaxNode::new(NodeKind::CompilationUnit, 1).with_children(
                    values.iter().enumerate().map(|(i, v)| {
                        SyntaxNode::new(NodeKind::StringLiteral, i as u32 + 1).with_text(*v)
                    }),
                ),
                directives: vec![],
            })],
            packages: vec![],
        }
    }

    async fn findings(rule: MatcherRule, values: &[&str]) -> Vec<u32> {
        rule.analyze(&model(values), &CancellationToken::new())
            .await
            .unwrap()
            .findings
            .iter()
            .map(|f| f.line())
            .collect()
    }

    #[tokio::test]
    async fn unc_paths() {
        let rule = unc_path_rule(&CatalogConfig::default()).unwrap();
        let lines = findings(rule, &[r"\\fileserver\share\x", r"\n", "//server/share"]).await;
        assert_eq!(lines, vec![1]);
    }

    #[tokio::test]
    async fn environment_tokens_are_case_insensitive() {
        let rule = environment_token_rule(&CatalogConfig::default()).unwrap();
        let lines = findings(
            rule,
            &[r"%AppData%\Contoso", r"%ProgramFiles(x86)%\Tool", "100% done", "%HOME%/x"],
        )
        .await;
        assert_eq!(lines, vec![1, 2]);
    }

    #[tokio::test]
    async fn relative_backslash_paths() {
        let rule = backslash_separator_rule(&CatalogConfig::default()).unwrap();
        let lines = findings(rule, &[r"logs\app.log", r"C:\logs\app.log", "logs/app.log"]).await;
        assert_eq!(lines, vec![1]);
    }

    #[tokio::test]
    async fn absolute_path_is_high() {
        let rule = absolute_path_rule(&CatalogConfig::default()).unwrap();
        let outcome = rule
            .analyze(&model(&[r"C:\Temp\data.txt"]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.findings[0].severity(), Severity::High);
        assert_eq!(outcome.findings[0].rule_id(), "FS001");
    }
}
