//! Configuration and hosting-state rules (CFG0xx).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::CatalogConfig;
use crate::error::RuleError;
use crate::finding::{AnalyzerCategory, Severity};
use crate::rules::matchers::{MatcherRule, TypeIdentityMatcher, simple_name};
use crate::rules::{Rule, RuleMeta, RuleOutcome, scan_units};
use crate::source::model::{LoadedModel, NodeKind};

pub const LEGACY_CONFIGURATION: RuleMeta = RuleMeta {
    id: "CFG001",
    name: "Legacy configuration API",
    category: AnalyzerCategory::Configuration,
    severity: Severity::Medium,
};

pub const IN_MEMORY_SESSION: RuleMeta = RuleMeta {
    id: "CFG002",
    name: "In-process session state",
    category: AnalyzerCategory::Configuration,
    severity: Severity::Medium,
};

pub fn legacy_configuration_rule(config: &CatalogConfig) -> MatcherRule {
    MatcherRule::new(
        LEGACY_CONFIGURATION,
        TypeIdentityMatcher::new(&config.legacy_config_types),
        "Legacy configuration API {evidence} used in '{subject}'",
        "Bind settings through Microsoft.Extensions.Configuration (IConfiguration, \
         IOptions<T>) instead of {evidence}.",
    )
}

/// CFG002: session state registered without a shared backing store.
///
/// Every in-memory registration site in a unit is collected while walking it.
/// The decision is made once the unit is finished: if the same unit also
/// registers a persistent store, none of its sites are reported.
#[derive(Debug, Clone)]
pub struct SessionStoreRule {
    in_memory: Vec<String>,
    persistent: Vec<String>,
}

impl SessionStoreRule {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            in_memory: config.in_memory_session_markers.clone(),
            persistent: config.persistent_store_markers.clone(),
        }
    }
}

/// `services.AddSession(o => ...)` → `AddSession`.
fn invoked_method(text: &str) -> &str {
    simple_name(text.split('(').next().unwrap_or(text))
}

fn is_marker(method: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| m.eq_ignore_ascii_case(method))
}

#[async_trait]
impl Rule for SessionStoreRule {
    fn id(&self) -> &str {
        IN_MEMORY_SESSION.id
    }

    fn name(&self) -> &str {
        IN_MEMORY_SESSION.name
    }

    fn category(&self) -> AnalyzerCategory {
        IN_MEMORY_SESSION.category
    }

    async fn analyze(
        &self,
        model: &LoadedModel,
        cancel: &CancellationToken,
    ) -> Result<RuleOutcome, RuleError> {
        scan_units(model, cancel, |cx, out| {
            let mut sites: Vec<(u32, &str)> = Vec::new();
            let mut saw_persistent = false;

            for node in cx.unit.root.descendants() {
                if node.kind != NodeKind::Invocation {
                    continue;
                }
                let method = invoked_method(node.text());
                if is_marker(method, &self.persistent) {
                    saw_persistent = true;
                } else if is_marker(method, &self.in_memory) {
                    sites.push((node.line, method));
                }
            }

            if saw_persistent {
                return Ok(());
            }
            for (line, method) in sites {
                out.push(IN_MEMORY_SESSION.finding(
                    cx.path(),
                    line,
                    format!("{method} keeps session state in process memory"),
                    "Back session state with a distributed cache (Redis, SQL Server) so it \
                     survives restarts and is shared across instances.",
                ));
            }
            Ok(())
        })
    }
}
