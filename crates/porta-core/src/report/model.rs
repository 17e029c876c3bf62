use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::engine::RunState;
use crate::finding::{AnalyzerCategory, Finding, Severity};

/// Result of one completed analysis run.
///
/// This struct is the stable JSON contract handed to report generators. It is
/// built once by the aggregator and exposes read-only accessors only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    schema_version: String,
    tool: ToolInfo,
    timestamp: DateTime<Utc>,
    source_id: String,
    status: RunState,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    duration: Duration,
    units_scanned: usize,
    dependency_inventory: BTreeMap<String, usize>,
    findings: Vec<Finding>,
    rule_failures: Vec<RuleFailure>,
    skipped_units: Vec<SkippedUnit>,
    summary: ResultSummary,
}

/// Everything the aggregator assembles into a result.
pub(crate) struct ResultParts {
    pub timestamp: DateTime<Utc>,
    pub source_id: String,
    pub duration: Duration,
    pub units_scanned: usize,
    pub dependency_inventory: BTreeMap<String, usize>,
    pub findings: Vec<Finding>,
    pub rule_failures: Vec<RuleFailure>,
    pub skipped_units: Vec<SkippedUnit>,
    pub summary: ResultSummary,
}

impl AnalysisResult {
    pub(crate) fn from_parts(parts: ResultParts) -> Self {
        Self {
            schema_version: crate::SCHEMA_VERSION.to_string(),
            tool: ToolInfo::current(),
            timestamp: parts.timestamp,
            source_id: parts.source_id,
            status: RunState::Complete,
            duration: parts.duration,
            units_scanned: parts.units_scanned,
            dependency_inventory: parts.dependency_inventory,
            findings: parts.findings,
            rule_failures: parts.rule_failures,
            skipped_units: parts.skipped_units,
            summary: parts.summary,
        }
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn tool(&self) -> &ToolInfo {
        &self.tool
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn status(&self) -> RunState {
        self.status
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn units_scanned(&self) -> usize {
        self.units_scanned
    }

    pub fn dependency_inventory(&self) -> &BTreeMap<String, usize> {
        &self.dependency_inventory
    }

    /// Post-filter findings in deterministic order.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn rule_failures(&self) -> &[RuleFailure] {
        &self.rule_failures
    }

    pub fn skipped_units(&self) -> &[SkippedUnit] {
        &self.skipped_units
    }

    pub fn summary(&self) -> &ResultSummary {
        &self.summary
    }

    /// Count per severity; every level is present, possibly with zero.
    pub fn severity_histogram(&self) -> BTreeMap<Severity, usize> {
        severity_histogram(&self.findings)
    }

    /// Count per category that at least one finding reports into.
    pub fn category_histogram(&self) -> BTreeMap<AnalyzerCategory, usize> {
        category_histogram(&self.findings)
    }

    /// Sum of severity weights over the findings, in developer-days.
    pub fn total_effort(&self) -> f64 {
        total_effort(&self.findings)
    }
}

pub(crate) fn severity_histogram(findings: &[Finding]) -> BTreeMap<Severity, usize> {
    let mut histogram: BTreeMap<Severity, usize> =
        Severity::ALL.iter().map(|s| (*s, 0)).collect();
    for f in findings {
        *histogram.entry(f.severity()).or_default() += 1;
    }
    histogram
}

pub(crate) fn category_histogram(findings: &[Finding]) -> BTreeMap<AnalyzerCategory, usize> {
    let mut histogram: BTreeMap<AnalyzerCategory, usize> = BTreeMap::new();
    for f in findings {
        *histogram.entry(f.category()).or_default() += 1;
    }
    histogram
}

pub(crate) fn total_effort(findings: &[Finding]) -> f64 {
    findings.iter().map(|f| f.severity().weight()).sum()
}

/// Tool metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
    pub rule_catalog_version: String,
}

impl ToolInfo {
    pub fn current() -> Self {
        Self {
            name: crate::TOOL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            rule_catalog_version: crate::RULE_CATALOG_VERSION.to_string(),
        }
    }
}

/// Derived views, computed once at aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_category: BTreeMap<AnalyzerCategory, usize>,
    pub total_effort_days: f64,
    /// Hex SHA-256 over the ordered finding fingerprints.
    pub findings_digest: String,
}

/// A rule that failed, for the whole run (`unit` is `None`) or for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFailure {
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub message: String,
}

/// A compilation unit the source model could not load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedUnit {
    pub path: String,
    pub reason: String,
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
