//! Run orchestration.
//!
//! The engine loads every unit the source model enumerates, runs each
//! registered rule over the loaded model and isolates rule failures so one
//! broken detector cannot abort the run.

pub mod filter;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ExecutionMode};
use crate::engine::filter::FindingFilter;
use crate::error::{EngineError, RuleError};
use crate::finding::{AnalyzerCategory, Finding, Severity};
use crate::report::aggregate::Aggregator;
use crate::report::model::{AnalysisResult, RuleFailure, SkippedUnit};
use crate::rules::catalog::RuleRegistry;
use crate::rules::{Rule, RuleMeta, RuleOutcome};
use crate::source::model::{LoadedModel, PackageReference, SourceModel};

/// Advisory emitted for every unit the source model failed to load.
pub const UNIT_SKIPPED: RuleMeta = RuleMeta {
    id: "ENG001",
    name: "Unit could not be analyzed",
    category: AnalyzerCategory::General,
    severity: Severity::Info,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Loading,
    Running,
    Aggregating,
    Complete,
    /// The source model could not be obtained.
    Fatal,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Complete | RunState::Fatal | RunState::Cancelled
        )
    }

    pub fn can_advance_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Running)
                | (Loading, Fatal)
                | (Loading, Cancelled)
                | (Running, Aggregating)
                | (Running, Cancelled)
                | (Aggregating, Complete)
        )
    }
}

/// Tracks a run's state and rejects illegal transitions.
#[derive(Debug, Clone)]
pub struct RunTracker {
    state: RunState,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
        }
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn advance(&mut self, next: RunState) -> Result<(), EngineError> {
        if !self.state.can_advance_to(next) {
            return Err(EngineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!("run state {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Callbacks fired around each rule, always in registration order.
pub trait ProgressObserver: Send + Sync {
    fn rule_started(&self, _rule_id: &str, _index: usize, _total: usize) {}

    fn rule_finished(&self, _rule_id: &str, _findings: usize, _failed: bool) {}
}

/// Unfiltered output of the loading and rule phases.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub source_id: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Units that were loaded and handed to rules.
    pub units_scanned: usize,
    pub packages: Vec<PackageReference>,
    /// Engine advisories first, then rule findings in registration order.
    pub findings: Vec<Finding>,
    pub rule_failures: Vec<RuleFailure>,
    pub skipped_units: Vec<SkippedUnit>,
}

/// How one rule invocation ended.
enum Settled {
    Done(RuleOutcome),
    Failed(String),
    Cancelled,
}

impl Settled {
    fn from_result(result: Result<RuleOutcome, RuleError>, cancel: &CancellationToken) -> Self {
        match result {
            Ok(outcome) => Settled::Done(outcome),
            Err(RuleError::Cancelled) if cancel.is_cancelled() => Settled::Cancelled,
            Err(RuleError::Cancelled) => {
                Settled::Failed("rule reported cancellation without a cancelled run".to_string())
            }
            Err(RuleError::Failed(err)) => Settled::Failed(format!("{err:#}")),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    format!("rule panicked: {detail}")
}

pub struct Engine {
    registry: RuleRegistry,
    config: EngineConfig,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl Engine {
    pub fn new(registry: RuleRegistry, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load, run, filter and aggregate.
    pub async fn analyze(
        &self,
        model: &dyn SourceModel,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, EngineError> {
        let filter = FindingFilter::new(&self.config.filter)?;
        let mut tracker = RunTracker::new();

        let mut run = self.run(model, cancel, &mut tracker).await?;

        tracker.advance(RunState::Aggregating)?;
        let raw = std::mem::take(&mut run.findings);
        let raw_count = raw.len();
        let filtered = filter.apply(raw);
        debug!("filter kept {} of {} findings", filtered.len(), raw_count);

        let result = Aggregator::aggregate(run, filtered);
        tracker.advance(RunState::Complete)?;

        info!(
            "analysis of {} complete: {} findings, {:.1} effort-days, {} rule failures",
            result.source_id(),
            result.findings().len(),
            result.summary().total_effort_days,
            result.rule_failures().len()
        );
        Ok(result)
    }

    /// Load and run without filtering or aggregation.
    pub async fn execute(
        &self,
        model: &dyn SourceModel,
        cancel: &CancellationToken,
    ) -> Result<RunOutput, EngineError> {
        let mut tracker = RunTracker::new();
        self.run(model, cancel, &mut tracker).await
    }

    async fn run(
        &self,
        model: &dyn SourceModel,
        cancel: &CancellationToken,
        tracker: &mut RunTracker,
    ) -> Result<RunOutput, EngineError> {
        let started_at = Utc::now();
        let clock = Instant::now();

        tracker.advance(RunState::Loading)?;
        info!(
            "analyzing {} with {} rules ({:?})",
            model.source_id(),
            self.registry.len(),
            self.config.mode
        );

        let handles = match model.enumerate() {
            Ok(handles) => handles,
            Err(err) => {
                warn!("source model {} unavailable: {}", model.source_id(), err);
                tracker.advance(RunState::Fatal)?;
                return Err(EngineError::FatalLoad(err));
            }
        };

        let mut units = Vec::with_capacity(handles.len());
        let mut skipped_units = Vec::new();
        let mut findings = Vec::new();

        for handle in &handles {
            if cancel.is_cancelled() {
                return Self::cancelled(tracker);
            }
            match model.load(handle) {
                Ok(unit) => units.push(unit),
                Err(err) => {
                    warn!("skipping {}: {}", handle.path, err);
                    if self.config.unit_advisories {
                        findings.push(UNIT_SKIPPED.finding(
                            &handle.path,
                            1,
                            format!("Unit could not be analyzed: {err}"),
                            "Fix the file so it can be parsed, then re-run the analysis; \
                             its portability risks are not reflected in this report.",
                        ));
                    }
                    skipped_units.push(SkippedUnit {
                        path: handle.path.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let loaded = Arc::new(LoadedModel {
            source_id: model.source_id().to_string(),
            units,
            packages: model.package_references(),
        });
        debug!(
            "loaded {} units, skipped {}",
            loaded.units.len(),
            skipped_units.len()
        );

        tracker.advance(RunState::Running)?;
        let settled = match self.config.mode {
            ExecutionMode::Sequential => self.run_sequential(&loaded, cancel).await,
            ExecutionMode::Concurrent => self.run_concurrent(&loaded, cancel).await,
        };

        let mut rule_failures = Vec::new();
        for (rule, outcome) in self.registry.all().iter().zip(settled) {
            match outcome {
                Settled::Done(outcome) => {
                    debug!("rule {} produced {} findings", rule.id(), outcome.findings.len());
                    for failure in outcome.unit_failures {
                        warn!("rule {} failed on {}: {}", rule.id(), failure.path, failure.message);
                        rule_failures.push(RuleFailure {
                            rule_id: rule.id().to_string(),
                            unit: Some(failure.path),
                            message: failure.message,
                        });
                    }
                    findings.extend(outcome.findings);
                }
                Settled::Failed(message) => {
                    warn!("rule {} failed: {}", rule.id(), message);
                    rule_failures.push(RuleFailure {
                        rule_id: rule.id().to_string(),
                        unit: None,
                        message,
                    });
                }
                Settled::Cancelled => return Self::cancelled(tracker),
            }
        }

        if cancel.is_cancelled() {
            return Self::cancelled(tracker);
        }

        let units_scanned = loaded.units.len();
        let packages = Arc::try_unwrap(loaded)
            .map(|m| m.packages)
            .unwrap_or_else(|shared| shared.packages.clone());

        Ok(RunOutput {
            source_id: model.source_id().to_string(),
            started_at,
            elapsed: clock.elapsed(),
            units_scanned,
            packages,
            findings,
            rule_failures,
            skipped_units,
        })
    }

    fn cancelled(tracker: &mut RunTracker) -> Result<RunOutput, EngineError> {
        info!("analysis cancelled during {:?}", tracker.state());
        tracker.advance(RunState::Cancelled)?;
        Err(EngineError::Cancelled)
    }

    /// One rule at a time. Stops early on cancellation; the missing tail is
    /// never read because the caller bails on the `Cancelled` entry.
    async fn run_sequential(
        &self,
        model: &Arc<LoadedModel>,
        cancel: &CancellationToken,
    ) -> Vec<Settled> {
        let total = self.registry.len();
        let mut settled = Vec::with_capacity(total);

        for (index, rule) in self.registry.all().iter().enumerate() {
            if cancel.is_cancelled() {
                settled.push(Settled::Cancelled);
                break;
            }
            self.notify_started(rule.as_ref(), index, total);

            let outcome = match AssertUnwindSafe(rule.analyze(model, cancel))
                .catch_unwind()
                .await
            {
                Ok(result) => Settled::from_result(result, cancel),
                Err(payload) => Settled::Failed(panic_message(payload)),
            };

            self.notify_finished(rule.as_ref(), &outcome);
            let stop = matches!(outcome, Settled::Cancelled);
            settled.push(outcome);
            if stop {
                break;
            }
        }
        settled
    }

    /// One task per rule. Results are slotted back by registration index.
    async fn run_concurrent(
        &self,
        model: &Arc<LoadedModel>,
        cancel: &CancellationToken,
    ) -> Vec<Settled> {
        let total = self.registry.len();
        let mut tasks = JoinSet::new();

        for (index, rule) in self.registry.all().iter().enumerate() {
            self.notify_started(rule.as_ref(), index, total);
            let rule = Arc::clone(rule);
            let model = Arc::clone(model);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let result = AssertUnwindSafe(rule.analyze(&model, &cancel))
                    .catch_unwind()
                    .await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<Settled>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(result))) => {
                    slots[index] = Some(Settled::from_result(result, cancel));
                }
                Ok((index, Err(payload))) => {
                    slots[index] = Some(Settled::Failed(panic_message(payload)));
                }
                Err(err) => warn!("rule task did not complete: {}", err),
            }
        }

        self.registry
            .all()
            .iter()
            .zip(slots)
            .map(|(rule, slot)| {
                let outcome =
                    slot.unwrap_or_else(|| Settled::Failed("rule task produced no result".into()));
                self.notify_finished(rule.as_ref(), &outcome);
                outcome
            })
            .collect()
    }

    fn notify_started(&self, rule: &dyn Rule, index: usize, total: usize) {
        debug!("running rule {} ({}/{})", rule.id(), index + 1, total);
        if let Some(observer) = &self.observer {
            observer.rule_started(rule.id(), index, total);
        }
    }

    fn notify_finished(&self, rule: &dyn Rule, outcome: &Settled) {
        if let Some(observer) = &self.observer {
            let (findings, failed) = match outcome {
                Settled::Done(o) => (o.findings.len(), !o.unit_failures.is_empty()),
                Settled::Failed(_) => (0, true),
                Settled::Cancelled => (0, false),
            };
            observer.rule_finished(rule.id(), findings, failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::{InMemorySourceModel, MemoryUnit};
    use crate::source::model::{NodeKind, SyntaxNode};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Fixed {
        id: &'static str,
        severity: Severity,
    }

    #[async_trait]
    impl Rule for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn category(&self) -> AnalyzerCategory {
            AnalyzerCategory::General
        }

        async fn analyze(
            &self,
            model: &LoadedModel,
            _cancel: &CancellationToken,
        ) -> Result<RuleOutcome, RuleError> {
            Ok(model
                .units
                .iter()
                .map(|u| {
                    Finding::new(
                        self.id,
                        AnalyzerCategory::General,
                        self.severity,
                        u.unit.path.as_str(),
                        1,
                        "m",
                        "r",
                    )
                })
                .collect::<Vec<_>>()
                .into())
        }
    }

    #[derive(Debug)]
    struct Panics;

    #[async_trait]
    impl Rule for Panics {
        fn id(&self) -> &str {
            "BOOM"
        }

        fn name(&self) -> &str {
            "panics"
        }

        fn category(&self) -> AnalyzerCategory {
            AnalyzerCategory::General
        }

        async fn analyze(
            &self,
            _model: &LoadedModel,
            _cancel: &CancellationToken,
        ) -> Result<RuleOutcome, RuleError> {
            panic!("index out of range")
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ProgressObserver for Recorder {
        fn rule_started(&self, rule_id: &str, _index: usize, _total: usize) {
            self.0.lock().unwrap().push(format!("start {rule_id}"));
        }

        fn rule_finished(&self, rule_id: &str, _findings: usize, failed: bool) {
            self.0.lock().unwrap().push(format!("finish {rule_id} {failed}"));
        }
    }

    fn source(paths: &[&str]) -> InMemorySourceModel {
        paths.iter().fold(InMemorySourceModel::new("test"), |m, p| {
            m.with_unit(MemoryUnit::new(*p, SyntaxNode::new(NodeKind::CompilationUnit, 1)))
        })
    }

    fn registry() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        registry
            .register(Fixed {
                id: "A",
                severity: Severity::High,
            })
            .register(Panics)
            .register(Fixed {
                id: "C",
                severity: Severity::Low,
            });
        registry
    }

    #[test]
    fn legal_and_illegal_transitions() {
        let mut tracker = RunTracker::new();
        tracker.advance(RunState::Loading).unwrap();
        tracker.advance(RunState::Running).unwrap();
        assert!(matches!(
            tracker.advance(RunState::Complete),
            Err(EngineError::InvalidTransition {
                from: RunState::Running,
                to: RunState::Complete
            })
        ));
        tracker.advance(RunState::Aggregating).unwrap();
        tracker.advance(RunState::Complete).unwrap();
        assert!(tracker.state().is_terminal());
        assert!(tracker.advance(RunState::Loading).is_err());
    }

    #[tokio::test]
    async fn panicking_rule_is_isolated() {
        let engine = Engine::new(registry(), EngineConfig::default());
        let out = engine
            .execute(&source(&["a.cs", "b.cs"]), &CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<&str> = out.findings.iter().map(|f| f.rule_id()).collect();
        assert_eq!(ids, vec!["A", "A", "C", "C"]);
        assert_eq!(out.rule_failures.len(), 1);
        assert_eq!(out.rule_failures[0].rule_id, "BOOM");
        assert!(out.rule_failures[0].message.contains("index out of range"));
        assert_eq!(out.units_scanned, 2);
    }

    #[tokio::test]
    async fn concurrent_mode_matches_sequential_order() {
        let sequential = Engine::new(registry(), EngineConfig::default());
        let concurrent = Engine::new(
            registry(),
            EngineConfig {
                mode: ExecutionMode::Concurrent,
                ..EngineConfig::default()
            },
        );
        let model = source(&["a.cs", "b.cs", "c.cs"]);
        let token = CancellationToken::new();

        let a = sequential.execute(&model, &token).await.unwrap();
        let b = concurrent.execute(&model, &token).await.unwrap();
        assert_eq!(a.findings, b.findings);
        assert_eq!(a.rule_failures, b.rule_failures);
    }

    #[tokio::test]
    async fn observer_sees_rules_in_registration_order() {
        let recorder = Arc::new(Recorder::default());
        let engine = Engine::new(registry(), EngineConfig::default())
            .with_observer(recorder.clone());
        engine
            .execute(&source(&["a.cs"]), &CancellationToken::new())
            .await
            .unwrap();

        let events = recorder.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "start A",
                "finish A false",
                "start BOOM",
                "finish BOOM true",
                "start C",
                "finish C false",
            ]
        );
    }

    #[tokio::test]
    async fn unreadable_unit_is_skipped_with_advisory() {
        let model = source(&["a.cs"]).with_unit(
            MemoryUnit::new("bad.cs", SyntaxNode::new(NodeKind::CompilationUnit, 1))
                .unreadable("invalid utf-8"),
        );
        let engine = Engine::new(RuleRegistry::new(), EngineConfig::default());
        let out = engine.execute(&model, &CancellationToken::new()).await.unwrap();

        assert_eq!(out.units_scanned, 1);
        assert_eq!(out.skipped_units.len(), 1);
        assert_eq!(out.skipped_units[0].path, "bad.cs");
        assert_eq!(out.findings.len(), 1);
        assert_eq!(out.findings[0].rule_id(), "ENG001");
        assert_eq!(out.findings[0].severity(), Severity::Info);
    }

    #[tokio::test]
    async fn advisories_can_be_disabled() {
        let model = source(&[]).with_unit(
            MemoryUnit::new("bad.cs", SyntaxNode::new(NodeKind::CompilationUnit, 1))
                .unreadable("locked"),
        );
        let engine = Engine::new(
            RuleRegistry::new(),
            EngineConfig {
                unit_advisories: false,
                ..EngineConfig::default()
            },
        );
        let out = engine.execute(&model, &CancellationToken::new()).await.unwrap();
        assert!(out.findings.is_empty());
        assert_eq!(out.skipped_units.len(), 1);
    }

    #[tokio::test]
    async fn unavailable_model_is_fatal() {
        let mut model = source(&["a.cs"]);
        model.unavailable = Some("solution not found".into());
        let engine = Engine::new(registry(), EngineConfig::default());
        let err = engine
            .execute(&model, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::FatalLoad(_)));
    }

    #[tokio::test]
    async fn cancelled_token_yields_no_result() {
        let token = CancellationToken::new();
        token.cancel();
        let engine = Engine::new(registry(), EngineConfig::default());
        let err = engine.analyze(&source(&["a.cs"]), &token).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }
}
