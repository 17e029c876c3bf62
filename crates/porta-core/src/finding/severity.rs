use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Risk level of a finding.
///
/// Declaration order is the semantic order: `Info < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Every severity, weakest first.
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Estimated remediation cost in developer-days.
    pub const fn weight(self) -> f64 {
        match self {
            Severity::Critical => 5.0,
            Severity::High => 3.0,
            Severity::Medium => 1.0,
            Severity::Low => 0.5,
            Severity::Info => 0.1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Info => "Info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" | "informational" => Ok(Severity::Info),
            other => Err(format!(
                "unknown severity: {other} (expected critical|high|medium|low|info)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_order_matches_risk() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);

        let mut sorted = Severity::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Severity::ALL.to_vec());
    }

    #[test]
    fn weight_defined_for_every_severity() {
        let weights: Vec<f64> = Severity::ALL.iter().map(|s| s.weight()).collect();
        assert_eq!(weights, vec![0.1, 0.5, 1.0, 3.0, 5.0]);
    }

    #[test]
    fn weight_is_monotonic_in_severity() {
        for pair in Severity::ALL.windows(2) {
            assert!(pair[0].weight() < pair[1].weight());
        }
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Severity>(), Ok(Severity::High));
        assert_eq!(" medium ".parse::<Severity>(), Ok(Severity::Medium));
        assert_eq!("Informational".parse::<Severity>(), Ok(Severity::Info));
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn serializes_as_name() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"Critical\"");
        let back: Severity = serde_json::from_str("\"Low\"").unwrap();
        assert_eq!(back, Severity::Low);
    }
}
