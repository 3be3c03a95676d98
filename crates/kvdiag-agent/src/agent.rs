use crate::client::{
    ClientFactory, ClientSpec, ClusterClient, CommandDeadline, HttpClientFactory, ReadOptions,
};
use crate::discovery::{SrvResolver, SystemSrvResolver};
use crate::Result;
use kvdiag_types::{GlobalConfig, MemberListResponse, RangeResponse, StatusResponse};
use std::sync::Arc;
use tracing::debug;

/// Read-only access to the cluster under one run configuration.
///
/// Cheap to clone; every check holds its own copy.
#[derive(Clone)]
pub struct Agent {
    config: Arc<GlobalConfig>,
    factory: Arc<dyn ClientFactory>,
    resolver: Arc<dyn SrvResolver>,
}

impl Agent {
    /// Agent talking to real members and the system DNS resolver.
    pub fn new(config: GlobalConfig) -> Self {
        Self::with_backends(
            config,
            Arc::new(HttpClientFactory),
            Arc::new(SystemSrvResolver),
        )
    }

    pub fn with_backends(
        config: GlobalConfig,
        factory: Arc<dyn ClientFactory>,
        resolver: Arc<dyn SrvResolver>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            factory,
            resolver,
        }
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub(crate) fn resolver(&self) -> &dyn SrvResolver {
        self.resolver.as_ref()
    }

    fn connect(&self, endpoints: Vec<String>) -> Result<Box<dyn ClusterClient>> {
        let spec = ClientSpec::without_endpoints(&self.config).with_endpoints(endpoints);
        self.factory.connect(&spec)
    }

    fn deadline(&self) -> CommandDeadline {
        CommandDeadline::new(self.config.command_timeout)
    }

    /// Member list as seen through `endpoints`.
    ///
    /// With no endpoints, falls back to discovery and then the configured list.
    pub fn member_list(&self, endpoints: &[String]) -> Result<MemberListResponse> {
        let endpoints = if endpoints.is_empty() {
            self.endpoints_from_cmd()?
        } else {
            endpoints.to_vec()
        };

        debug!(endpoints = ?endpoints, "listing members");
        let client = self.connect(endpoints)?;
        client.member_list(&self.deadline())
    }

    pub fn endpoint_status(&self, endpoint: &str) -> Result<StatusResponse> {
        debug!(endpoint = %endpoint, "fetching endpoint status");
        let client = self.connect(vec![endpoint.to_string()])?;
        client.status(endpoint, &self.deadline())
    }

    pub fn read(
        &self,
        endpoints: &[String],
        key: &str,
        options: ReadOptions,
    ) -> Result<RangeResponse> {
        debug!(key = %key, serializable = options.serializable, "reading key");
        let client = self.connect(endpoints.to_vec())?;
        client.get(key, options, &self.deadline())
    }

    /// Metrics exposition of one endpoint, split into lines.
    pub fn metrics(&self, endpoint: &str) -> Result<Vec<String>> {
        debug!(endpoint = %endpoint, "scraping metrics");
        let client = self.connect(vec![endpoint.to_string()])?;
        let body = client.metrics(endpoint, &self.deadline())?;
        Ok(body.split('\n').map(str::to_string).collect())
    }
}
