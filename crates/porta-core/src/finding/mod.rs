mod category;
mod model;
mod severity;

pub use category::AnalyzerCategory;
pub use model::Finding;
pub use severity::Severity;
