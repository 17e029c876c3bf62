//! Platform-specific API rules (WIN0xx).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::CatalogConfig;
use crate::error::RuleError;
use crate::finding::{AnalyzerCategory, Severity};
use crate::rules::matchers::{
    AttributePresenceMatcher, DirectiveScanMatcher, InheritanceChainMatcher, MatcherRule,
    NamespacePrefixMatcher, TypeIdentityMatcher, attribute_name_matches,
};
use crate::rules::{Rule, RuleMeta, RuleOutcome, scan_units};
use crate::source::model::{LoadedModel, NodeKind, SyntaxNode};

pub const WINDOWS_NAMESPACE: RuleMeta = RuleMeta {
    id: "WIN001",
    name: "Windows-only namespace",
    category: AnalyzerCategory::PlatformApi,
    severity: Severity::High,
};

pub const NATIVE_INTEROP: RuleMeta = RuleMeta {
    id: "WIN002",
    name: "P/Invoke into Windows native library",
    category: AnalyzerCategory::PlatformApi,
    severity: Severity::Critical,
};

pub const WINDOWS_TYPE: RuleMeta = RuleMeta {
    id: "WIN003",
    name: "Windows-only type",
    category: AnalyzerCategory::PlatformApi,
    severity: Severity::High,
};

pub const PLATFORM_DIRECTIVE: RuleMeta = RuleMeta {
    id: "WIN004",
    name: "Windows conditional compilation",
    category: AnalyzerCategory::PlatformApi,
    severity: Severity::Medium,
};

pub const PLATFORM_BASE_TYPE: RuleMeta = RuleMeta {
    id: "WIN005",
    name: "Derives from Windows-only base type",
    category: AnalyzerCategory::PlatformApi,
    severity: Severity::High,
};

pub const COM_INTEROP: RuleMeta = RuleMeta {
    id: "WIN006",
    name: "COM interop attribute",
    category: AnalyzerCategory::PlatformApi,
    severity: Severity::Medium,
};

pub fn windows_namespace_rule(config: &CatalogConfig) -> MatcherRule {
    MatcherRule::new(
        WINDOWS_NAMESPACE,
        NamespacePrefixMatcher::new(&config.windows_namespaces),
        "Reference to Windows-only namespace '{subject}' ({evidence})",
        "Isolate '{evidence}' behind an abstraction with a cross-platform implementation, \
         or guard it with OperatingSystem.IsWindows().",
    )
}

pub fn windows_type_rule(config: &CatalogConfig) -> MatcherRule {
    MatcherRule::new(
        WINDOWS_TYPE,
        TypeIdentityMatcher::new(&config.windows_types),
        "Use of Windows-only type {evidence} in '{subject}'",
        "Replace {evidence} with a portable alternative (configuration files, \
         structured logging, cross-platform metrics).",
    )
}

pub fn platform_directive_rule(config: &CatalogConfig) -> MatcherRule {
    MatcherRule::new(
        PLATFORM_DIRECTIVE,
        DirectiveScanMatcher::new(&config.directive_tokens),
        "Conditional compilation on platform symbol {evidence}: {subject}",
        "Prefer runtime checks (OperatingSystem.Is*) or target-framework neutral code \
         over the {evidence} symbol.",
    )
}

pub fn platform_base_type_rule(config: &CatalogConfig) -> MatcherRule {
    MatcherRule::new(
        PLATFORM_BASE_TYPE,
        InheritanceChainMatcher::new(&config.platform_base_types),
        "Type '{subject}' derives from Windows-only {evidence}",
        "Rehost '{subject}' on a cross-platform base (e.g. BackgroundService, \
         ASP.NET Core middleware) instead of {evidence}.",
    )
}

pub fn com_interop_rule(config: &CatalogConfig) -> MatcherRule {
    MatcherRule::new(
        COM_INTEROP,
        AttributePresenceMatcher::new(&config.com_attributes),
        "COM interop attribute [{evidence}] on '{subject}'",
        "COM is only available on Windows; remove [{evidence}] or provide a managed \
         implementation for other platforms.",
    )
}

/// WIN002: `[DllImport("kernel32.dll")]` and friends.
///
/// Combines attribute presence with a check on the attribute's first string
/// argument, so P/Invoke into non-Windows libraries is not reported here.
#[derive(Debug, Clone)]
pub struct NativeInteropRule {
    attributes: Vec<String>,
    libraries: Vec<String>,
}

impl NativeInteropRule {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            attributes: config.pinvoke_attributes.clone(),
            libraries: config
                .native_libraries
                .iter()
                .map(|l| normalize_library(l))
                .collect(),
        }
    }

    fn library_of<'n>(&self, attribute: &'n SyntaxNode) -> Option<&'n str> {
        attribute
            .descendants()
            .find(|n| n.kind == NodeKind::StringLiteral)
            .map(SyntaxNode::text)
    }
}

/// `C:\Windows\System32\KERNEL32.DLL` → `kernel32`.
fn normalize_library(name: &str) -> String {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let lower = file.to_ascii_lowercase();
    lower
        .strip_suffix(".dll")
        .map(str::to_string)
        .unwrap_or(lower)
}

#[async_trait]
impl Rule for NativeInteropRule {
    fn id(&self) -> &str {
        NATIVE_INTEROP.id
    }

    fn name(&self) -> &str {
        NATIVE_INTEROP.name
    }

    fn category(&self) -> AnalyzerCategory {
        NATIVE_INTEROP.category
    }

    async fn analyze(
        &self,
        model: &LoadedModel,
        cancel: &CancellationToken,
    ) -> Result<RuleOutcome, RuleError> {
        scan_units(model, cancel, |cx, out| {
            for decl in cx.unit.root.descendants() {
                for attr in decl.children_of(NodeKind::Attribute) {
                    if attribute_name_matches(attr.text(), &self.attributes).is_none() {
                        continue;
                    }
                    let Some(library) = self.library_of(attr) else {
                        continue;
                    };
                    if !self.libraries.contains(&normalize_library(library)) {
                        continue;
                    }
                    let function = if decl.text().is_empty() {
                        "<unnamed>"
                    } else {
                        decl.text()
                    };
                    out.push(NATIVE_INTEROP.finding(
                        cx.path(),
                        attr.line,
                        format!("P/Invoke '{function}' is bound to Windows library \"{library}\""),
                        format!(
                            "Replace the call into {library} with a managed API, or move it \
                             behind an interface with per-platform implementations."
                        ),
                    ));
                }
            }
            Ok(())
        })
    }
}
