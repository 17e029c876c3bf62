use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse domain area a rule reports into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalyzerCategory {
    PlatformApi,
    Filesystem,
    Security,
    Configuration,
    Dependencies,
    General,
}

impl AnalyzerCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            AnalyzerCategory::PlatformApi => "platform-api",
            AnalyzerCategory::Filesystem => "filesystem",
            AnalyzerCategory::Security => "security",
            AnalyzerCategory::Configuration => "configuration",
            AnalyzerCategory::Dependencies => "dependencies",
            AnalyzerCategory::General => "general",
        }
    }
}

impl fmt::Display for AnalyzerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
