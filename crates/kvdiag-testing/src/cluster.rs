//! In-memory cluster for exercising resolution and checks without a network.
//!
//! The same `FakeCluster` value is handed to an `Agent` as its client
//! factory and as its SRV resolver, so one builder chain describes both the
//! members and the DNS records that advertise them.

use kvdiag_agent::{
    Agent, ClientFactory, ClientSpec, ClusterClient, CommandDeadline, Error, ReadOptions, Result,
    SrvResolver, SrvTarget,
};
use kvdiag_types::{
    GlobalConfig, KeyValue, Member, MemberListResponse, RangeResponse, ResponseHeader,
    StatusResponse,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cluster state shared by every client handle it hands out.
///
/// # Example
/// ```no_run
/// use kvdiag_testing::FakeCluster;
/// use kvdiag_types::GlobalConfig;
///
/// let cluster = FakeCluster::new()
///     .with_member(1, "infra0", &["http://10.0.0.1:2379"])
///     .with_member(2, "infra1", &["http://10.0.0.2:2379"]);
///
/// let agent = cluster.agent(GlobalConfig::default());
/// let members = agent.member_list(&[]).unwrap();
/// assert_eq!(members.members.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<ClusterState>>,
}

#[derive(Default)]
struct ClusterState {
    members: Vec<Member>,
    statuses: HashMap<String, StatusResponse>,
    metrics: HashMap<String, String>,
    kvs: BTreeMap<String, KeyValue>,
    down: HashSet<String>,
    srv: HashMap<String, Vec<SrvTarget>>,
    connections: Vec<ClientSpec>,
    revision: i64,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().expect("fake cluster state poisoned")
    }

    /// Add a voting member advertising `client_urls`.
    pub fn with_member(self, id: u64, name: &str, client_urls: &[&str]) -> Self {
        self.push_member(id, name, client_urls, false)
    }

    pub fn with_learner(self, id: u64, name: &str, client_urls: &[&str]) -> Self {
        self.push_member(id, name, client_urls, true)
    }

    fn push_member(self, id: u64, name: &str, client_urls: &[&str], is_learner: bool) -> Self {
        self.state().members.push(Member {
            id,
            name: name.to_string(),
            peer_urls: Vec::new(),
            client_urls: client_urls.iter().map(|u| u.to_string()).collect(),
            is_learner,
        });
        self
    }

    /// Status served by `endpoint`.
    pub fn with_status(self, endpoint: &str, status: StatusResponse) -> Self {
        self.state().statuses.insert(endpoint.to_string(), status);
        self
    }

    /// Metrics exposition text served by `endpoint`.
    pub fn with_metrics(self, endpoint: &str, body: &str) -> Self {
        self.state()
            .metrics
            .insert(endpoint.to_string(), body.to_string());
        self
    }

    /// Store `value` under `key` at the next revision.
    pub fn with_key(self, key: &str, value: &str) -> Self {
        {
            let mut state = self.state();
            state.revision += 1;
            let revision = state.revision;
            let version = state.kvs.get(key).map(|kv| kv.version).unwrap_or(0) + 1;
            let create_revision = state
                .kvs
                .get(key)
                .map(|kv| kv.create_revision)
                .unwrap_or(revision);
            state.kvs.insert(
                key.to_string(),
                KeyValue {
                    key: key.as_bytes().to_vec(),
                    create_revision,
                    mod_revision: revision,
                    version,
                    value: value.as_bytes().to_vec(),
                    lease: 0,
                },
            );
        }
        self
    }

    /// Requests to `endpoint` never complete within their deadline.
    pub fn with_down_endpoint(self, endpoint: &str) -> Self {
        self.state().down.insert(endpoint.to_string());
        self
    }

    /// SRV answers for a full record name such as `_etcd-client._tcp.example.com`.
    pub fn with_srv(self, record: &str, targets: &[(&str, u16)]) -> Self {
        self.state().srv.insert(
            record.to_string(),
            targets
                .iter()
                .map(|(host, port)| SrvTarget {
                    host: host.to_string(),
                    port: *port,
                })
                .collect(),
        );
        self
    }

    /// Every client spec the cluster was asked to connect with, in order.
    pub fn connections(&self) -> Vec<ClientSpec> {
        self.state().connections.clone()
    }

    /// Agent whose clients and DNS lookups are served by this cluster.
    pub fn agent(&self, config: GlobalConfig) -> Agent {
        Agent::with_backends(config, Arc::new(self.clone()), Arc::new(self.clone()))
    }

    fn header(&self) -> ResponseHeader {
        let state = self.state();
        ResponseHeader {
            cluster_id: 1,
            member_id: state.members.first().map(|m| m.id).unwrap_or(0),
            revision: state.revision,
            raft_term: 2,
        }
    }

    fn is_down(&self, endpoint: &str) -> bool {
        self.state().down.contains(endpoint)
    }
}

impl ClientFactory for FakeCluster {
    fn connect(&self, spec: &ClientSpec) -> Result<Box<dyn ClusterClient>> {
        self.state().connections.push(spec.clone());
        if spec.endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }
        Ok(Box::new(FakeClient {
            cluster: self.clone(),
            endpoints: spec.endpoints.clone(),
        }))
    }
}

impl SrvResolver for FakeCluster {
    fn lookup_srv(&self, name: &str) -> Result<Vec<SrvTarget>> {
        self.state()
            .srv
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Discovery(format!("lookup {}: no such host", name)))
    }
}

struct FakeClient {
    cluster: FakeCluster,
    endpoints: Vec<String>,
}

impl FakeClient {
    /// First endpoint of the handle that is up.
    fn live_endpoint(&self, deadline: &CommandDeadline) -> Result<&str> {
        self.endpoints
            .iter()
            .find(|ep| !self.cluster.is_down(ep))
            .map(String::as_str)
            .ok_or(Error::DeadlineExceeded(deadline.timeout()))
    }

    fn not_found(endpoint: &str) -> Error {
        Error::Status {
            endpoint: endpoint.to_string(),
            code: 404,
            body: "404 page not found".to_string(),
        }
    }
}

impl ClusterClient for FakeClient {
    fn member_list(&self, deadline: &CommandDeadline) -> Result<MemberListResponse> {
        self.live_endpoint(deadline)?;
        Ok(MemberListResponse {
            header: self.cluster.header(),
            members: self.cluster.state().members.clone(),
        })
    }

    fn status(&self, endpoint: &str, deadline: &CommandDeadline) -> Result<StatusResponse> {
        if self.cluster.is_down(endpoint) {
            return Err(Error::DeadlineExceeded(deadline.timeout()));
        }
        let status = self.cluster.state().statuses.get(endpoint).cloned();
        let mut status = status.ok_or_else(|| Self::not_found(endpoint))?;
        status.header = self.cluster.header();
        Ok(status)
    }

    fn get(
        &self,
        key: &str,
        _options: ReadOptions,
        deadline: &CommandDeadline,
    ) -> Result<RangeResponse> {
        self.live_endpoint(deadline)?;
        let kvs: Vec<KeyValue> = self.cluster.state().kvs.get(key).cloned().into_iter().collect();
        Ok(RangeResponse {
            header: self.cluster.header(),
            count: kvs.len() as i64,
            kvs,
            more: false,
        })
    }

    fn metrics(&self, endpoint: &str, deadline: &CommandDeadline) -> Result<String> {
        if self.cluster.is_down(endpoint) {
            return Err(Error::DeadlineExceeded(deadline.timeout()));
        }
        self.cluster
            .state()
            .metrics
            .get(endpoint)
            .cloned()
            .ok_or_else(|| Self::not_found(endpoint))
    }
}
