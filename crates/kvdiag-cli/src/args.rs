use crate::types::LogLevel;
use clap::Parser;
use std::path::PathBuf;

/// Flags only override the configuration when given, so every setting that
/// has a built-in default is optional here.
#[derive(Parser, Debug)]
#[command(name = "kvdiag")]
#[command(about = "One-stop key-value cluster diagnosis tool", long_about = None)]
#[command(version)]
pub struct Cli {
    /// TOML file with default settings; flags override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Comma separated cluster endpoints
    #[arg(long, value_delimiter = ',', value_name = "ENDPOINTS")]
    pub endpoints: Option<Vec<String>>,

    /// Use all endpoints from the cluster member list
    #[arg(long)]
    pub cluster: bool,

    /// Dial timeout for client connections, in milliseconds
    #[arg(long, value_name = "MS")]
    pub dial_timeout: Option<u64>,

    /// Command timeout (excluding dial timeout), in milliseconds
    #[arg(long, value_name = "MS")]
    pub command_timeout: Option<u64>,

    /// Keepalive time for client connections, in milliseconds
    #[arg(long, value_name = "MS")]
    pub keepalive_time: Option<u64>,

    /// Keepalive timeout for client connections, in milliseconds
    #[arg(long, value_name = "MS")]
    pub keepalive_timeout: Option<u64>,

    /// Disable transport security for client connections
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub insecure_transport: Option<bool>,

    /// Skip server certificate verification
    #[arg(long)]
    pub insecure_skip_tls_verify: bool,

    /// Identify secure client using this TLS certificate file
    #[arg(long, value_name = "FILE")]
    pub cert: Option<PathBuf>,

    /// Identify secure client using this TLS key file
    #[arg(long, value_name = "FILE")]
    pub key: Option<PathBuf>,

    /// Verify certificates of TLS-enabled secure servers using this CA bundle
    #[arg(long, value_name = "FILE")]
    pub cacert: Option<PathBuf>,

    /// Username[:password] for authentication
    #[arg(long, value_name = "USER")]
    pub user: Option<String>,

    /// Password for authentication (--user must not include one then)
    #[arg(long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Domain name to query for SRV records describing cluster endpoints
    #[arg(short = 'd', long, value_name = "DOMAIN")]
    pub discovery_srv: Option<String>,

    /// Service name to query when using DNS discovery
    #[arg(long, value_name = "NAME")]
    pub discovery_srv_name: Option<String>,

    /// Accept insecure SRV records describing cluster endpoints
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub insecure_discovery: Option<bool>,

    /// Storage quota of the members in bytes (their --quota-backend-bytes)
    #[arg(long, alias = "etcd-storage-quota-bytes", value_name = "BYTES")]
    pub storage_quota_bytes: Option<u64>,

    /// Analyze a stopped member's data directory instead of the live cluster
    #[arg(long)]
    pub offline: bool,

    /// Path to the member's data directory
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    pub log_level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bool_flags_accept_bare_and_explicit_values() {
        let cli = Cli::try_parse_from(["kvdiag", "--insecure-transport"]).unwrap();
        assert_eq!(cli.insecure_transport, Some(true));

        let cli = Cli::try_parse_from(["kvdiag", "--insecure-transport=false"]).unwrap();
        assert_eq!(cli.insecure_transport, Some(false));

        let cli = Cli::try_parse_from(["kvdiag"]).unwrap();
        assert_eq!(cli.insecure_transport, None);
    }

    #[test]
    fn test_endpoints_are_comma_separated() {
        let cli = Cli::try_parse_from([
            "kvdiag",
            "--endpoints",
            "a:2379,b:2379",
            "-d",
            "example.com",
        ])
        .unwrap();
        assert_eq!(
            cli.endpoints,
            Some(vec!["a:2379".to_string(), "b:2379".to_string()])
        );
        assert_eq!(cli.discovery_srv.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_storage_quota_alias() {
        let cli = Cli::try_parse_from(["kvdiag", "--etcd-storage-quota-bytes", "1024"]).unwrap();
        assert_eq!(cli.storage_quota_bytes, Some(1024));
    }
}
