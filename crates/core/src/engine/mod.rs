mod analyzer;
mod project;
mod scheduler;

pub use analyzer::Analyzer;
pub use project::{ProjectScanner, ScanError};
pub use scheduler::AnalysisScheduler;
