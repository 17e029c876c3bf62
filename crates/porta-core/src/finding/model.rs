use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::finding::{AnalyzerCategory, Severity};

/// A single detected issue.
///
/// Fields are private: a finding is never mutated after the rule that
/// emitted it hands it to the engine. The serialized shape is flat:
/// `file`, `line`, `message`, `recommendation`, `severity`, `category`, `ruleId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    file: String,
    line: u32,
    message: String,
    recommendation: String,
    severity: Severity,
    category: AnalyzerCategory,
    rule_id: String,
}

impl Finding {
    pub fn new(
        rule_id: impl Into<String>,
        category: AnalyzerCategory,
        severity: Severity,
        file: impl Into<String>,
        line: u32,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            // Lines are 1-based; adapters that report 0 mean "unknown".
            line: line.max(1),
            message: message.into(),
            recommendation: recommendation.into(),
            severity,
            category,
            rule_id: rule_id.into(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn category(&self) -> AnalyzerCategory {
        self.category
    }

    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    /// Stable identity of this finding: SHA-256 over rule id, file, line and message.
    ///
    /// Depends only on finding content, so identical input produces identical
    /// fingerprints across runs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.rule_id.as_bytes(),
            self.file.as_bytes(),
            self.line.to_string().as_bytes(),
            self.message.as_bytes(),
        ] {
            hasher.update(part);
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Finding {
        Finding::new(
            "WIN002",
            AnalyzerCategory::PlatformApi,
            Severity::Critical,
            "src/Native.cs",
            12,
            "P/Invoke into kernel32.dll",
            "Replace with a cross-platform API.",
        )
    }

    #[test]
    fn serializes_flat_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["file"], "src/Native.cs");
        assert_eq!(json["line"], 12);
        assert_eq!(json["severity"], "Critical");
        assert_eq!(json["category"], "platform-api");
        assert_eq!(json["ruleId"], "WIN002");
        assert!(json.get("recommendation").is_some());
        assert_eq!(json.as_object().unwrap().len(), 7);
    }

    #[test]
    fn zero_line_is_clamped_to_first_line() {
        let f = Finding::new(
            "X",
            AnalyzerCategory::General,
            Severity::Info,
            "a",
            0,
            "m",
            "r",
        );
        assert_eq!(f.line(), 1);
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let a = sample();
        assert_eq!(a.fingerprint(), sample().fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let b = Finding::new(
            "WIN002",
            AnalyzerCategory::PlatformApi,
            Severity::Critical,
            "src/Native.cs",
            13,
            "P/Invoke into kernel32.dll",
            "Replace with a cross-platform API.",
        );
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
