use crate::args::Cli;
use anyhow::{Context, Result, bail};
use kvdiag_types::GlobalConfig;
use std::path::Path;
use std::time::Duration;

/// Build the run configuration: defaults, then the `--config` file, then flags.
pub fn load(cli: &Cli) -> Result<GlobalConfig> {
    let mut config = match &cli.config {
        Some(path) => load_from(path)?,
        None => GlobalConfig::default(),
    };
    apply_flags(&mut config, cli);

    if config.offline && config.data_dir.is_none() {
        bail!("--data-dir is required for offline analysis");
    }
    Ok(config)
}

/// Read a TOML configuration file. Unset keys keep their defaults.
pub fn load_from(path: &Path) -> Result<GlobalConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: GlobalConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

fn apply_flags(config: &mut GlobalConfig, cli: &Cli) {
    if let Some(endpoints) = &cli.endpoints {
        config.endpoints = endpoints.clone();
    }
    if cli.cluster {
        config.use_cluster_endpoints = true;
    }

    if let Some(ms) = cli.dial_timeout {
        config.dial_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.command_timeout {
        config.command_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.keepalive_time {
        config.keepalive_time = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.keepalive_timeout {
        config.keepalive_timeout = Duration::from_millis(ms);
    }

    if let Some(insecure) = cli.insecure_transport {
        config.insecure_transport = insecure;
    }
    if cli.insecure_skip_tls_verify {
        config.insecure_skip_verify = true;
    }
    if let Some(cert) = &cli.cert {
        config.cert_file = Some(cert.clone());
    }
    if let Some(key) = &cli.key {
        config.key_file = Some(key.clone());
    }
    if let Some(ca) = &cli.cacert {
        config.ca_file = Some(ca.clone());
    }

    if let Some(user) = &cli.user {
        config.username = Some(user.clone());
    }
    if let Some(password) = &cli.password {
        config.password = Some(password.clone());
    }

    if let Some(domain) = &cli.discovery_srv {
        config.dns_domain = Some(domain.clone());
    }
    if let Some(service) = &cli.discovery_srv_name {
        config.dns_service = Some(service.clone());
    }
    if let Some(insecure) = cli.insecure_discovery {
        config.insecure_discovery = insecure;
    }

    if let Some(quota) = cli.storage_quota_bytes {
        config.db_quota_bytes = quota;
    }

    if cli.offline {
        config.offline = true;
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
}
