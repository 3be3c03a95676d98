//! TestWorld pattern for CLI integration tests.
//!
//! Every run happens in its own temporary working directory, which is where
//! the diagnosis report lands.

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Name of the report file written into the working directory.
pub const REPORT_FILE_NAME: &str = "kvdiag_report.json";

/// Endpoint on which nothing listens.
pub const UNREACHABLE_ENDPOINT: &str = "127.0.0.1:1";

/// Isolated environment for running the `kvdiag` binary.
///
/// # Example
/// ```ignore
/// use assert_cmd::cargo::cargo_bin_cmd;
/// use kvdiag_testing::TestWorld;
///
/// let world = TestWorld::new();
/// let mut cmd = cargo_bin_cmd!("kvdiag");
/// world.configure_command(&mut cmd);
/// cmd.arg("--version").assert().success();
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    /// Working directory of the commands run in this world.
    pub fn cwd(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a TOML configuration file and return its path.
    pub fn write_config(&self, contents: &str) -> Result<PathBuf> {
        let path = self.cwd().join("kvdiag.toml");
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Configure a CLI command with this world's working directory.
    ///
    /// The caller provides the base command, e.g. `cargo_bin_cmd!("kvdiag")`.
    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> &'a mut Command {
        cmd.current_dir(self.cwd())
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
    }

    pub fn report_path(&self) -> PathBuf {
        self.cwd().join(REPORT_FILE_NAME)
    }

    /// Parse the report written by the last diagnosis run.
    pub fn read_report(&self) -> Result<serde_json::Value> {
        let path = self.report_path();
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(serde_json::from_str(&text)?)
    }
}
