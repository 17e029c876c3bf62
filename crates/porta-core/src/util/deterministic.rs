//! Deterministic ordering helpers.
//!
//! Everything that reaches an `AnalysisResult` is ordered here, so identical
//! input produces byte-identical JSON regardless of how rules were scheduled.

use sha2::{Digest, Sha256};

use crate::finding::Finding;
use crate::report::model::{RuleFailure, SkippedUnit};

/// Sort findings by `(file, line, rule_id, message)`.
///
/// The sort is stable, so findings equal on every key keep their emission
/// order. This ordering is part of the result contract.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        (a.file(), a.line(), a.rule_id(), a.message()).cmp(&(
            b.file(),
            b.line(),
            b.rule_id(),
            b.message(),
        ))
    });
}

/// Sort rule failures by `(rule_id, unit)`; run-level failures sort first.
pub fn sort_rule_failures(failures: &mut [RuleFailure]) {
    failures.sort_by(|a, b| {
        (a.rule_id.as_str(), a.unit.as_deref()).cmp(&(b.rule_id.as_str(), b.unit.as_deref()))
    });
}

/// Sort skipped units by path.
pub fn sort_skipped_units(units: &mut [SkippedUnit]) {
    units.sort_by(|a, b| a.path.cmp(&b.path));
}

/// SHA-256 over the fingerprints of `findings` in the order given.
///
/// Callers sort first; an empty slice yields the digest of no input.
pub fn digest_findings(findings: &[Finding]) -> String {
    let mut hasher = Sha256::new();
    for finding in findings {
        hasher.update(finding.fingerprint().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
