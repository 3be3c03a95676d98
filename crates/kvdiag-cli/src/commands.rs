use crate::args::Cli;
use crate::config;
use anyhow::{Context, Result};
use kvdiag_agent::Agent;
use kvdiag_engine::{Engine, ReportWriter};
use kvdiag_offline::analyze_offline;
use kvdiag_types::GlobalConfig;
use std::path::Path;
use tracing::info;

pub fn run(cli: Cli) -> Result<()> {
    let config = config::load(&cli)?;

    if config.offline
        && let Some(data_dir) = &config.data_dir
    {
        return run_offline(data_dir);
    }
    run_online(config)
}

fn run_offline(data_dir: &Path) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    analyze_offline(data_dir, &mut out)?;
    Ok(())
}

fn run_online(config: GlobalConfig) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let agent = Agent::new(config.clone());
    let engine = Engine::new(config, kvdiag_plugins::default_plugins(&agent));

    info!("Diagnosing with {}", engine.plugin_names().join(", "));
    engine.diagnose(&ReportWriter::new(cwd))?;
    Ok(())
}
