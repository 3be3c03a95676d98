// Health checks run by the diagnosis engine.
//
// Every check holds its own `Agent`, resolves endpoints itself and records
// operational failures in its result instead of returning them.

pub mod epstatus;
pub mod membership;
pub mod metrics;
pub mod read;

pub use epstatus::{EndpointStatus, EpStatusChecker, EpStatusResult};
pub use membership::{EndpointMembers, MembershipChecker, MembershipResult};
pub use metrics::{EndpointMetrics, MetricsChecker, MetricsResult};
pub use read::{ReadCheck, ReadChecker, ReadResult};

use kvdiag_agent::Agent;
use kvdiag_engine::Plugin;
use tracing::warn;

/// The full set of online checks, in the order they run.
pub fn default_plugins(agent: &Agent) -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(MembershipChecker::new(agent.clone())),
        Box::new(EpStatusChecker::new(agent.clone())),
        Box::new(ReadChecker::serializable(agent.clone())),
        Box::new(ReadChecker::linearizable(agent.clone())),
        Box::new(MetricsChecker::new(agent.clone())),
    ]
}

/// Endpoints to probe, or `None` after recording why there are none.
fn resolve_endpoints(agent: &Agent, summary: &mut Vec<String>) -> Option<Vec<String>> {
    match agent.endpoints() {
        Ok(endpoints) => Some(endpoints),
        Err(err) => {
            warn!("failed to resolve endpoints: {}", err);
            summary.push(format!("failed to resolve endpoints: {}", err));
            None
        }
    }
}
