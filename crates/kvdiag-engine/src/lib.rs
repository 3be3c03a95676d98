// Diagnosis engine.
//
// Plugins run one after another against the same read-only configuration;
// their results are collected in invocation order into a single report.

mod engine;
mod error;
mod plugin;
mod report;

pub use engine::Engine;
pub use error::{Error, Result};
pub use plugin::{DiagnosisResult, Plugin};
pub use report::{REPORT_FILE_NAME, Report, ReportWriter};
