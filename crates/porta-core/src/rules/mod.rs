//! Rule contract.
//!
//! A rule is a stateless detector constructed once and invoked per run. It
//! reads the loaded source model and returns findings through an explicit
//! result channel; it never mutates the model.
//!
//! Per-unit bookkeeping belongs inside the closure handed to [`scan_units`].
//! That closure runs once per compilation unit, so any state it declares is
//! created fresh for each unit and cannot leak into the next one.

pub mod catalog;
pub mod configuration;
pub mod dependencies;
pub mod filesystem;
pub mod matchers;
pub mod platform;
pub mod security;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

use crate::error::RuleError;
use crate::finding::{AnalyzerCategory, Finding, Severity};
use crate::source::model::{CompilationUnit, LoadedModel, LoadedUnit, SymbolResolver};

#[async_trait]
pub trait Rule: Send + Sync + Debug {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn category(&self) -> AnalyzerCategory;

    /// Analyze the loaded model.
    ///
    /// Implementations must observe `cancel` at least once per compilation
    /// unit and must produce the same outcome for unchanged input.
    async fn analyze(
        &self,
        model: &LoadedModel,
        cancel: &CancellationToken,
    ) -> Result<RuleOutcome, RuleError>;
}

/// Identity and defaults shared by every finding a rule emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMeta {
    pub id: &'static str,
    pub name: &'static str,
    pub category: AnalyzerCategory,
    pub severity: Severity,
}

impl RuleMeta {
    pub fn finding(
        &self,
        file: &str,
        line: u32,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Finding {
        Finding::new(
            self.id,
            self.category,
            self.severity,
            file,
            line,
            message,
            recommendation,
        )
    }
}

/// A compilation unit a rule could not analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub path: String,
    pub message: String,
}

/// Result of one rule over one run.
#[derive(Debug, Default)]
pub struct RuleOutcome {
    pub findings: Vec<Finding>,
    /// Units that contributed no findings because analysis failed for them.
    pub unit_failures: Vec<UnitFailure>,
}

impl From<Vec<Finding>> for RuleOutcome {
    fn from(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            unit_failures: Vec::new(),
        }
    }
}

/// Read-only view of one compilation unit during a rule's traversal.
#[derive(Clone, Copy)]
pub struct UnitContext<'a> {
    pub unit: &'a CompilationUnit,
    pub resolver: Option<&'a dyn SymbolResolver>,
}

impl<'a> UnitContext<'a> {
    pub fn new(loaded: &'a LoadedUnit) -> Self {
        Self {
            unit: &loaded.unit,
            resolver: loaded.resolver.as_deref(),
        }
    }

    pub fn path(&self) -> &'a str {
        &self.unit.path
    }
}

/// Drive `per_unit` over every loaded unit.
///
/// - cancellation is checked before each unit
/// - each call receives a fresh context and its own output buffer
/// - a unit whose closure fails contributes nothing and is recorded
///
/// `per_unit` is `Fn + Sync`: it cannot mutate its captures, so any state a
/// rule tracks while scanning one unit is local to that call.
pub fn scan_units<F>(
    model: &LoadedModel,
    cancel: &CancellationToken,
    per_unit: F,
) -> Result<RuleOutcome, RuleError>
where
    F: Fn(UnitContext<'_>, &mut Vec<Finding>) -> anyhow::Result<()> + Sync,
{
    let mut outcome = RuleOutcome::default();

    for loaded in &model.units {
        if cancel.is_cancelled() {
            return Err(RuleError::Cancelled);
        }

        let mut buffer = Vec::new();
        match per_unit(UnitContext::new(loaded), &mut buffer) {
            Ok(()) => outcome.findings.append(&mut buffer),
            Err(err) => outcome.unit_failures.push(UnitFailure {
                path: loaded.unit.path.clone(),
                message: format!("{err:#}"),
            }),
        }
    }

    Ok(outcome)
}
