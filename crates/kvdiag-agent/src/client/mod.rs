mod http;

pub use http::{HttpClientFactory, HttpClusterClient};

use crate::{Error, Result};
use kvdiag_types::{GlobalConfig, MemberListResponse, RangeResponse, StatusResponse};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Connection parameters for one client handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSpec {
    pub endpoints: Vec<String>,
    pub dial_timeout: Duration,
    pub keepalive_time: Duration,
    pub keepalive_timeout: Duration,
    pub insecure_transport: bool,
    pub insecure_skip_verify: bool,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub ca_file: Option<PathBuf>,
    pub credentials: Option<(String, String)>,
}

impl ClientSpec {
    /// Everything from the run configuration except where to connect.
    pub fn without_endpoints(cfg: &GlobalConfig) -> Self {
        Self {
            endpoints: Vec::new(),
            dial_timeout: cfg.dial_timeout,
            keepalive_time: cfg.keepalive_time,
            keepalive_timeout: cfg.keepalive_timeout,
            insecure_transport: cfg.insecure_transport,
            insecure_skip_verify: cfg.insecure_skip_verify,
            cert_file: cfg.cert_file.clone(),
            key_file: cfg.key_file.clone(),
            ca_file: cfg.ca_file.clone(),
            credentials: cfg.credentials(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self
    }
}

/// Budget for a single logical command.
#[derive(Debug, Clone, Copy)]
pub struct CommandDeadline {
    timeout: Duration,
    expires_at: Instant,
}

impl CommandDeadline {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            expires_at: Instant::now() + timeout,
        }
    }

    /// Time left, or `DeadlineExceeded` once the budget is spent.
    pub fn remaining(&self) -> Result<Duration> {
        let now = Instant::now();
        if now >= self.expires_at {
            return Err(Error::DeadlineExceeded(self.timeout));
        }
        Ok(self.expires_at - now)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Serve the read from the contacted member's local state instead of
    /// going through consensus.
    pub serializable: bool,
}

impl ReadOptions {
    pub fn linearizable() -> Self {
        Self {
            serializable: false,
        }
    }

    pub fn serializable() -> Self {
        Self { serializable: true }
    }
}

/// A connected client handle. Dropping it releases the connection.
pub trait ClusterClient {
    fn member_list(&self, deadline: &CommandDeadline) -> Result<MemberListResponse>;

    fn status(&self, endpoint: &str, deadline: &CommandDeadline) -> Result<StatusResponse>;

    fn get(
        &self,
        key: &str,
        options: ReadOptions,
        deadline: &CommandDeadline,
    ) -> Result<RangeResponse>;

    /// Raw metrics exposition text served by `endpoint`.
    fn metrics(&self, endpoint: &str, deadline: &CommandDeadline) -> Result<String>;
}

/// Produces client handles for a resolved endpoint set.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, spec: &ClientSpec) -> Result<Box<dyn ClusterClient>>;
}

/// Give a schemeless endpoint the scheme implied by the transport setting.
pub fn normalize_endpoint(endpoint: &str, insecure_transport: bool) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.contains("://") {
        return endpoint.to_string();
    }
    let scheme = if insecure_transport { "http" } else { "https" };
    format!("{}://{}", scheme, endpoint)
}
