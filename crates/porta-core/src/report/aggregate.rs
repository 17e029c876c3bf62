//! Turns a filtered run into an `AnalysisResult`.

use std::collections::BTreeMap;

use crate::engine::RunOutput;
use crate::finding::Finding;
use crate::report::model::{
    AnalysisResult, ResultParts, ResultSummary, category_histogram, severity_histogram,
    total_effort,
};
use crate::util::deterministic::{
    digest_findings, sort_findings, sort_rule_failures, sort_skipped_units,
};

pub struct Aggregator;

impl Aggregator {
    /// Build the result from `run` and the findings that survived filtering.
    ///
    /// `run.findings` is ignored; the caller has already moved the raw
    /// findings through the filter.
    pub fn aggregate(run: RunOutput, mut filtered: Vec<Finding>) -> AnalysisResult {
        sort_findings(&mut filtered);

        let RunOutput {
            source_id,
            started_at,
            elapsed,
            units_scanned,
            packages,
            mut rule_failures,
            mut skipped_units,
            ..
        } = run;
        sort_rule_failures(&mut rule_failures);
        sort_skipped_units(&mut skipped_units);

        let mut dependency_inventory: BTreeMap<String, usize> = BTreeMap::new();
        for package in &packages {
            *dependency_inventory.entry(package.name.clone()).or_default() += 1;
        }

        let summary = ResultSummary {
            by_severity: severity_histogram(&filtered),
            by_category: category_histogram(&filtered),
            total_effort_days: total_effort(&filtered),
            findings_digest: digest_findings(&filtered),
        };

        AnalysisResult::from_parts(ResultParts {
            timestamp: started_at,
            source_id,
            duration: elapsed,
            units_scanned,
            dependency_inventory,
            findings: filtered,
            rule_failures,
            skipped_units,
            summary,
        })
    }
}
