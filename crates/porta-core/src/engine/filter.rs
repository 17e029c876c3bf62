//! Severity cutoff and path exclusion.
//!
//! Both filters depend only on the finding and the configuration, so they
//! commute and can be applied in either order.

use globset::{GlobBuilder, GlobMatcher};

use crate::config::FilterConfig;
use crate::error::ConfigError;
use crate::finding::{Finding, Severity};

#[derive(Debug, Clone)]
enum ExcludePattern {
    Glob(GlobMatcher),
    /// Lowercased needle.
    Substring(String),
}

impl ExcludePattern {
    fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let normalized = normalize_path(pattern);
        if normalized.contains(['*', '?', '[', '{']) {
            let glob = GlobBuilder::new(&normalized)
                .case_insensitive(true)
                .build()
                .map_err(|source| ConfigError::Glob {
                    pattern: pattern.to_string(),
                    source,
                })?;
            Ok(Self::Glob(glob.compile_matcher()))
        } else {
            Ok(Self::Substring(normalized.to_lowercase()))
        }
    }

    fn is_match(&self, path: &str) -> bool {
        match self {
            Self::Glob(glob) => glob.is_match(path),
            Self::Substring(needle) => path.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// `.\src\Legacy\A.cs` → `src/Legacy/A.cs`.
fn normalize_path(path: &str) -> String {
    let mut path = path.replace('\\', "/");
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.to_string();
    }
    path
}

#[derive(Debug, Clone)]
pub struct FindingFilter {
    min_severity: Severity,
    excludes: Vec<ExcludePattern>,
}

impl FindingFilter {
    pub fn new(config: &FilterConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            min_severity: config.min_severity,
            excludes: config
                .exclude_patterns
                .iter()
                .map(|p| ExcludePattern::compile(p))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn passes_severity(&self, finding: &Finding) -> bool {
        finding.severity() >= self.min_severity
    }

    pub fn is_excluded(&self, finding: &Finding) -> bool {
        if self.excludes.is_empty() {
            return false;
        }
        let path = normalize_path(finding.file());
        self.excludes.iter().any(|p| p.is_match(&path))
    }

    pub fn keeps(&self, finding: &Finding) -> bool {
        self.passes_severity(finding) && !self.is_excluded(finding)
    }

    /// Surviving findings, in their original relative order.
    pub fn apply(&self, findings: Vec<Finding>) -> Vec<Finding> {
        findings.into_iter().filter(|f| self.keeps(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::AnalyzerCategory;

    fn finding(severity: Severity, file: &str) -> Finding {
        Finding::new("T1", AnalyzerCategory::General, severity, file, 1, "m", "r")
    }

    fn sample() -> Vec<Finding> {
        vec![
            finding(Severity::Critical, "src/Native.cs"),
            finding(Severity::High, "src/Legacy/Registry.cs"),
            finding(Severity::High, "tests/PathTests.cs"),
            finding(Severity::Medium, r".\src\Startup.cs"),
            finding(Severity::Medium, "src/Generated/Ref.g.cs"),
            finding(Severity::Medium, "src/Web.cs"),
            finding(Severity::Info, "src/Other.cs"),
        ]
    }

    fn filter(min: Severity, patterns: &[&str]) -> FindingFilter {
        FindingFilter::new(&FilterConfig {
            min_severity: min,
            exclude_patterns: patterns.iter().map(|p| p.to_string()).collect(),
        })
        .unwrap()
    }

    #[test]
    fn default_filter_is_identity() {
        let f = FindingFilter::new(&FilterConfig::default()).unwrap();
        assert_eq!(f.apply(sample()), sample());
    }

    #[test]
    fn raising_cutoff_never_grows_survivors() {
        let mut previous = usize::MAX;
        for min in Severity::ALL {
            let kept = filter(min, &[]).apply(sample());
            assert!(kept.len() <= previous);
            assert!(kept.iter().all(|f| f.severity() >= min));
            previous = kept.len();
        }
    }

    #[test]
    fn exclusion_is_set_difference() {
        let f = filter(Severity::Info, &["tests/", "**/*.g.cs"]);
        let kept = f.apply(sample());
        let dropped: Vec<Finding> = sample()
            .into_iter()
            .filter(|x| !kept.contains(x))
            .collect();

        assert_eq!(kept.len() + dropped.len(), sample().len());
        assert!(dropped.iter().all(|x| f.is_excluded(x)));
        assert!(kept.iter().all(|x| !f.is_excluded(x)));
        assert_eq!(dropped.len(), 2);
    }

    #[test]
    fn substring_patterns_ignore_case_and_separator_style() {
        let f = filter(Severity::Info, &[r"SRC\legacy"]);
        assert!(f.is_excluded(&finding(Severity::High, "src/Legacy/Registry.cs")));
        assert!(!f.is_excluded(&finding(Severity::High, "src/Native.cs")));
    }

    #[test]
    fn glob_patterns_ignore_case() {
        let f = filter(Severity::Info, &["SRC/legacy/*.CS"]);
        assert!(f.is_excluded(&finding(Severity::High, "src/Legacy/Registry.cs")));
        assert!(!f.is_excluded(&finding(Severity::High, "src/Web.cs")));
    }

    #[test]
    fn leading_dot_slash_is_normalized() {
        let f = filter(Severity::Info, &["src/Startup.cs"]);
        assert!(f.is_excluded(&finding(Severity::Medium, r".\src\Startup.cs")));
    }

    #[test]
    fn filters_commute() {
        let cfg = filter(Severity::High, &["Legacy"]);
        let severity_only = filter(Severity::High, &[]);
        let exclude_only = filter(Severity::Info, &["Legacy"]);

        let a = exclude_only.apply(severity_only.apply(sample()));
        let b = severity_only.apply(exclude_only.apply(sample()));
        assert_eq!(a, b);
        assert_eq!(a, cfg.apply(sample()));
    }

    #[test]
    fn invalid_glob_is_config_error() {
        let result = FindingFilter::new(&FilterConfig {
            min_severity: Severity::Info,
            exclude_patterns: vec!["src/[".to_string()],
        });
        assert!(matches!(result, Err(ConfigError::Glob { .. })));
    }
}
