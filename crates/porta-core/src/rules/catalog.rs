//! Rule registry and the built-in catalog.

use std::sync::Arc;

use crate::config::CatalogConfig;
use crate::error::ConfigError;
use crate::rules::Rule;
use crate::rules::configuration::{SessionStoreRule, legacy_configuration_rule};
use crate::rules::dependencies::{LegacyPackageRule, legacy_namespace_rule, legacy_service_rule};
use crate::rules::filesystem::{
    absolute_path_rule, backslash_separator_rule, environment_token_rule, unc_path_rule,
};
use crate::rules::platform::{
    NativeInteropRule, com_interop_rule, platform_base_type_rule, platform_directive_rule,
    windows_namespace_rule, windows_type_rule,
};
use crate::rules::security::{
    embedded_password_rule, integrated_security_rule, windows_identity_rule,
};

/// Ordered set of rules. Registration order is execution and output order.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in catalog, driven by `config`'s tables.
    pub fn builtin(config: &CatalogConfig) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        registry
            .register(windows_namespace_rule(config))
            .register(NativeInteropRule::new(config))
            .register(windows_type_rule(config))
            .register(platform_directive_rule(config))
            .register(platform_base_type_rule(config))
            .register(com_interop_rule(config))
            .register(absolute_path_rule(config)?)
            .register(unc_path_rule(config)?)
            .register(environment_token_rule(config)?)
            .register(backslash_separator_rule(config)?)
            .register(windows_identity_rule(config))
            .register(embedded_password_rule(config)?)
            .register(integrated_security_rule(config)?)
            .register(legacy_configuration_rule(config))
            .register(SessionStoreRule::new(config))
            .register(LegacyPackageRule::new(config))
            .register(legacy_namespace_rule(config))
            .register(legacy_service_rule(config));
        Ok(registry)
    }

    pub fn register(&mut self, rule: impl Rule + 'static) -> &mut Self {
        self.register_shared(Arc::new(rule))
    }

    /// Register a rule instance that other registries may also hold.
    pub fn register_shared(&mut self, rule: Arc<dyn Rule>) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Keep only rules whose id is listed (case-insensitive), preserving order.
    pub fn filter_by_ids(self, ids: &[&str]) -> Self {
        Self {
            rules: self
                .rules
                .into_iter()
                .filter(|r| ids.iter().any(|id| id.eq_ignore_ascii_case(r.id())))
                .collect(),
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn all(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
