//! Security configuration rules (SEC0xx).

use crate::config::CatalogConfig;
use crate::error::ConfigError;
use crate::finding::{AnalyzerCategory, Severity};
use crate::rules::RuleMeta;
use crate::rules::matchers::{LiteralPatternMatcher, MatcherRule, TypeIdentityMatcher};

pub const WINDOWS_IDENTITY: RuleMeta = RuleMeta {
    id: "SEC001",
    name: "Windows identity or impersonation",
    category: AnalyzerCategory::Security,
    severity: Severity::High,
};

pub const EMBEDDED_PASSWORD: RuleMeta = RuleMeta {
    id: "SEC002",
    name: "Password embedded in connection string",
    category: AnalyzerCategory::Security,
    severity: Severity::High,
};

pub const INTEGRATED_SECURITY: RuleMeta = RuleMeta {
    id: "SEC003",
    name: "Windows integrated authentication in connection string",
    category: AnalyzerCategory::Security,
    severity: Severity::Medium,
};

pub fn windows_identity_rule(config: &CatalogConfig) -> MatcherRule {
    MatcherRule::new(
        WINDOWS_IDENTITY,
        TypeIdentityMatcher::new(&config.identity_types),
        "Windows identity API {evidence} used in '{subject}'",
        "Use claims-based identity (ClaimsPrincipal) and a platform-neutral authentication \
         handler instead of {evidence}.",
    )
}

pub fn embedded_password_rule(config: &CatalogConfig) -> Result<MatcherRule, ConfigError> {
    Ok(MatcherRule::new(
        EMBEDDED_PASSWORD,
        LiteralPatternMatcher::new(
            &[(
                "password key",
                config.literals.password_in_connection_string.as_str(),
            )],
            &[],
        )?,
        "Connection string literal contains an embedded password",
        "Load credentials from a secret store or environment configuration, never from source.",
    ))
}

pub fn integrated_security_rule(config: &CatalogConfig) -> Result<MatcherRule, ConfigError> {
    Ok(MatcherRule::new(
        INTEGRATED_SECURITY,
        LiteralPatternMatcher::new(
            &[(
                "integrated security",
                config.literals.integrated_security.as_str(),
            )],
            &[],
        )?,
        "Connection string relies on Windows integrated authentication",
        "Integrated Security requires a Windows domain identity; configure SQL, token or \
         managed-identity authentication for other hosts.",
    ))
}
