pub mod config;
pub mod engine;
pub mod error;
pub mod finding;
pub mod report;
pub mod rules;
pub mod source;
pub mod util;

use tokio_util::sync::CancellationToken;

use crate::config::{CatalogConfig, EngineConfig};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::report::model::AnalysisResult;
use crate::rules::catalog::RuleRegistry;
use crate::source::model::SourceModel;

pub const TOOL_NAME: &str = "porta";

/// JSON schema version of `AnalysisResult`.
/// Bump only when the serialized shape changes semantically.
pub const SCHEMA_VERSION: &str = "0.1.0";

pub const RULE_CATALOG_VERSION: &str = "0.1.0";

/// Run the built-in rule catalog over `model` and produce a filtered,
/// aggregated result.
///
/// A fatal source failure or a cancelled run yields `Err`; rule failures are
/// recorded inside the returned result.
pub async fn analyze(
    model: &dyn SourceModel,
    catalog: &CatalogConfig,
    config: EngineConfig,
    cancel: &CancellationToken,
) -> Result<AnalysisResult, EngineError> {
    let registry = RuleRegistry::builtin(catalog)?;
    let engine = Engine::new(registry, config);
    engine.analyze(model, cancel).await
}
