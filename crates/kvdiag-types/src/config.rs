use crate::util::duration_ms;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:2379";

/// Default storage quota the cluster members are assumed to run with (2 GiB).
pub const DEFAULT_DB_QUOTA_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Per-run configuration shared by every component.
///
/// Built once at process start and only ever read afterwards. It is also the
/// `input` section of the diagnosis report, so the password is never
/// serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub endpoints: Vec<String>,
    pub use_cluster_endpoints: bool,

    #[serde(rename = "dial_timeout_ms", with = "duration_ms")]
    pub dial_timeout: Duration,
    #[serde(rename = "command_timeout_ms", with = "duration_ms")]
    pub command_timeout: Duration,
    #[serde(rename = "keepalive_time_ms", with = "duration_ms")]
    pub keepalive_time: Duration,
    #[serde(rename = "keepalive_timeout_ms", with = "duration_ms")]
    pub keepalive_timeout: Duration,

    pub insecure_transport: bool,
    pub insecure_skip_verify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_service: Option<String>,
    pub insecure_discovery: bool,

    pub db_quota_bytes: u64,

    pub offline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![DEFAULT_ENDPOINT.to_string()],
            use_cluster_endpoints: false,
            dial_timeout: Duration::from_secs(2),
            command_timeout: Duration::from_secs(5),
            keepalive_time: Duration::from_secs(2),
            keepalive_timeout: Duration::from_secs(5),
            insecure_transport: true,
            insecure_skip_verify: false,
            cert_file: None,
            key_file: None,
            ca_file: None,
            username: None,
            password: None,
            dns_domain: None,
            dns_service: None,
            insecure_discovery: true,
            db_quota_bytes: DEFAULT_DB_QUOTA_BYTES,
            offline: false,
            data_dir: None,
        }
    }
}

impl GlobalConfig {
    /// Username and password to authenticate with, if any.
    ///
    /// `username` may carry `user:password`; the inline password is used only
    /// when no separate password was given.
    pub fn credentials(&self) -> Option<(String, String)> {
        let user = self.username.as_deref().filter(|u| !u.is_empty())?;

        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => Some((user.to_string(), password.to_string())),
            None => match user.split_once(':') {
                Some((name, password)) => Some((name.to_string(), password.to_string())),
                None => Some((user.to_string(), String::new())),
            },
        }
    }

    /// DNS discovery domain, when one is configured.
    pub fn discovery_domain(&self) -> Option<&str> {
        self.dns_domain.as_deref().filter(|d| !d.is_empty())
    }
}
