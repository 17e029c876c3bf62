//! Dependency and legacy-framework rules (DEP0xx).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{BannedPackage, CatalogConfig};
use crate::error::RuleError;
use crate::finding::{AnalyzerCategory, Severity};
use crate::rules::matchers::{AttributePresenceMatcher, MatcherRule, NamespacePrefixMatcher};
use crate::rules::{Rule, RuleMeta, RuleOutcome};
use crate::source::model::LoadedModel;

pub const LEGACY_PACKAGE: RuleMeta = RuleMeta {
    id: "DEP001",
    name: "Package without a cross-platform release",
    category: AnalyzerCategory::Dependencies,
    severity: Severity::High,
};

pub const LEGACY_NAMESPACE: RuleMeta = RuleMeta {
    id: "DEP002",
    name: "Legacy framework namespace",
    category: AnalyzerCategory::Dependencies,
    severity: Severity::Medium,
};

pub const LEGACY_SERVICE: RuleMeta = RuleMeta {
    id: "DEP003",
    name: "Legacy service contract attribute",
    category: AnalyzerCategory::Dependencies,
    severity: Severity::Medium,
};

pub fn legacy_namespace_rule(config: &CatalogConfig) -> MatcherRule {
    MatcherRule::new(
        LEGACY_NAMESPACE,
        NamespacePrefixMatcher::new(&config.legacy_namespaces),
        "Reference to legacy framework namespace '{subject}' ({evidence})",
        "'{evidence}' is not available on modern .NET; migrate to its ASP.NET Core or \
         gRPC counterpart.",
    )
}

pub fn legacy_service_rule(config: &CatalogConfig) -> MatcherRule {
    MatcherRule::new(
        LEGACY_SERVICE,
        AttributePresenceMatcher::new(&config.legacy_service_attributes),
        "Legacy service attribute [{evidence}] on '{subject}'",
        "Expose '{subject}' through ASP.NET Core controllers, minimal APIs or gRPC \
         instead of [{evidence}].",
    )
}

/// DEP001: package references with a known replacement.
///
/// Works on the model's package inventory rather than on syntax trees.
#[derive(Debug, Clone)]
pub struct LegacyPackageRule {
    banned: Vec<BannedPackage>,
}

impl LegacyPackageRule {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            banned: config.banned_packages.clone(),
        }
    }
}

#[async_trait]
impl Rule for LegacyPackageRule {
    fn id(&self) -> &str {
        LEGACY_PACKAGE.id
    }

    fn name(&self) -> &str {
        LEGACY_PACKAGE.name
    }

    fn category(&self) -> AnalyzerCategory {
        LEGACY_PACKAGE.category
    }

    async fn analyze(
        &self,
        model: &LoadedModel,
        cancel: &CancellationToken,
    ) -> Result<RuleOutcome, RuleError> {
        if cancel.is_cancelled() {
            return Err(RuleError::Cancelled);
        }

        let findings = model
            .packages
            .iter()
            .filter_map(|package| {
                let banned = self.banned.iter().find(|b| b.matches(&package.name))?;
                let version = package
                    .version
                    .as_deref()
                    .map(|v| format!(" {v}"))
                    .unwrap_or_default();
                Some(LEGACY_PACKAGE.finding(
                    &package.declared_in,
                    package.line,
                    format!(
                        "Package {}{version} targets the Windows-only framework",
                        package.name
                    ),
                    format!("Replace {} with {}.", package.name, banned.replacement),
                ))
            })
            .collect::<Vec<_>>();

        Ok(findings.into())
    }
}
