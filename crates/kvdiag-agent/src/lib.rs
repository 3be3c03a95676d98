// Cluster access for diagnostic checks.
//
// Every operation acquires its own client, runs exactly one request under
// the per-command deadline and drops the client before returning.

mod agent;
pub mod client;
pub mod discovery;
mod endpoints;
mod error;

pub use agent::Agent;
pub use client::{
    ClientFactory, ClientSpec, ClusterClient, CommandDeadline, HttpClientFactory, ReadOptions,
    normalize_endpoint,
};
pub use discovery::{SrvResolver, SrvTarget, SystemSrvResolver, discover_client_endpoints};
pub use error::{Error, Result};
