use crate::plugin::Plugin;
use crate::report::{Report, ReportWriter};
use crate::Result;
use kvdiag_types::GlobalConfig;
use std::path::PathBuf;
use tracing::{info, warn};

const SEPARATOR: &str = "---------------------------------------------------------";

/// Runs plugins strictly one at a time, in the order given.
pub struct Engine {
    config: GlobalConfig,
    plugins: Vec<Box<dyn Plugin>>,
}

impl Engine {
    pub fn new(config: GlobalConfig, plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self { config, plugins }
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Run every plugin once and collect the results.
    ///
    /// A result that fails to serialize is logged and still kept, so the
    /// report always holds one entry per plugin.
    pub fn run(&self) -> Report {
        let mut report = Report::new(self.config.clone());
        let total = self.plugins.len();

        for (i, plugin) in self.plugins.iter().enumerate() {
            info!("{}", SEPARATOR);
            info!("Running {} ({}/{})...", plugin.name(), i + 1, total);
            let result = plugin.diagnose();

            match result.to_value().and_then(|v| serde_json::to_string_pretty(&v)) {
                Ok(text) => info!("{}", text),
                Err(err) => warn!(plugin = plugin.name(), "failed to marshal result: {}", err),
            }

            report.results.push(result);
        }

        report
    }

    /// Run every plugin and write the report with `writer`.
    pub fn diagnose(&self, writer: &ReportWriter) -> Result<PathBuf> {
        let report = self.run();
        let path = writer.write(&report)?;
        info!("Report written to {}", path.display());
        Ok(path)
    }
}
