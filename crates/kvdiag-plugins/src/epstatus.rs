use crate::resolve_endpoints;
use kvdiag_agent::Agent;
use kvdiag_engine::{DiagnosisResult, Plugin};
use kvdiag_types::StatusResponse;
use serde::Serialize;
use std::collections::BTreeSet;

const NAME: &str = "epStatusChecker";

/// Largest raft index difference between members still considered healthy.
pub const RAFT_INDEX_GAP_THRESHOLD: u64 = 1000;

/// Share of the storage quota above which a member is flagged.
pub const DB_SIZE_QUOTA_RATIO: f64 = 0.8;

/// Collects the status of every endpoint and flags anything unhealthy.
pub struct EpStatusChecker {
    agent: Agent,
}

#[derive(Debug, Serialize)]
pub struct EpStatusResult {
    pub name: String,
    pub summary: Vec<String>,
    pub statuses: Vec<EndpointStatus>,
}

#[derive(Debug, Serialize)]
pub struct EndpointStatus {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EpStatusChecker {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    pub fn check(&self) -> EpStatusResult {
        let mut result = EpStatusResult {
            name: NAME.to_string(),
            summary: Vec::new(),
            statuses: Vec::new(),
        };

        let Some(endpoints) = resolve_endpoints(&self.agent, &mut result.summary) else {
            return result;
        };

        for endpoint in endpoints {
            match self.agent.endpoint_status(&endpoint) {
                Ok(status) => result.statuses.push(EndpointStatus {
                    endpoint,
                    status: Some(status),
                    error: None,
                }),
                Err(err) => {
                    result
                        .summary
                        .push(format!("failed to get endpoint status from {}: {}", endpoint, err));
                    result.statuses.push(EndpointStatus {
                        endpoint,
                        status: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let answered: Vec<(&str, &StatusResponse)> = result
            .statuses
            .iter()
            .filter_map(|s| s.status.as_ref().map(|st| (s.endpoint.as_str(), st)))
            .collect();
        let findings = evaluate(&answered, self.agent.config().db_quota_bytes);
        result.summary.extend(findings);
        result
    }
}

/// Health findings across the statuses that were retrieved.
fn evaluate(statuses: &[(&str, &StatusResponse)], db_quota_bytes: u64) -> Vec<String> {
    let mut findings = Vec::new();

    let leaders: BTreeSet<u64> = statuses.iter().map(|(_, s)| s.leader).collect();
    if leaders.len() > 1 {
        findings.push(format!("inconsistent leaders: {:?}", leaders));
    }

    let indexes = statuses.iter().map(|(_, s)| s.raft_index);
    if let (Some(min), Some(max)) = (indexes.clone().min(), indexes.max()) {
        let gap = max - min;
        if gap > RAFT_INDEX_GAP_THRESHOLD {
            findings.push(format!(
                "raft index gap {} exceeds {} (min {}, max {})",
                gap, RAFT_INDEX_GAP_THRESHOLD, min, max
            ));
        }
    }

    let db_size_limit = (db_quota_bytes as f64 * DB_SIZE_QUOTA_RATIO) as i64;
    for (endpoint, status) in statuses {
        if status.leader == 0 {
            findings.push(format!("{} has no leader", endpoint));
        }
        if status.db_size > db_size_limit {
            findings.push(format!(
                "{} db size {} bytes exceeds 80% of the storage quota {} bytes",
                endpoint, status.db_size, db_quota_bytes
            ));
        }
        if !status.errors.is_empty() {
            findings.push(format!(
                "{} reported errors: {}",
                endpoint,
                status.errors.join("; ")
            ));
        }
        if status.is_learner {
            findings.push(format!("{} is a learner", endpoint));
        }
    }

    findings
}

impl Plugin for EpStatusChecker {
    fn name(&self) -> &str {
        NAME
    }

    fn diagnose(&self) -> Box<dyn DiagnosisResult> {
        Box::new(self.check())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvdiag_testing::FakeCluster;
    use kvdiag_types::GlobalConfig;

    fn status(leader: u64, raft_index: u64, db_size: i64) -> StatusResponse {
        StatusResponse {
            version: "3.6.0".to_string(),
            leader,
            raft_index,
            db_size,
            ..Default::default()
        }
    }

    fn config(endpoints: &[&str]) -> GlobalConfig {
        GlobalConfig {
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_healthy_cluster_has_no_findings() {
        let cluster = FakeCluster::new()
            .with_status("a:2379", status(1, 100, 4096))
            .with_status("b:2379", status(1, 120, 4096));
        let checker = EpStatusChecker::new(cluster.agent(config(&["a:2379", "b:2379"])));

        let result = checker.check();
        assert!(result.summary.is_empty(), "{:?}", result.summary);
        assert_eq!(result.statuses.len(), 2);
    }

    #[test]
    fn test_flags_leader_and_index_gap() {
        let statuses = [status(1, 100, 0), status(2, 2000, 0)];
        let answered = vec![("a:2379", &statuses[0]), ("b:2379", &statuses[1])];

        let findings = evaluate(&answered, 1 << 30);
        assert_eq!(
            findings,
            vec![
                "inconsistent leaders: {1, 2}",
                "raft index gap 1900 exceeds 1000 (min 100, max 2000)"
            ]
        );
    }

    #[test]
    fn test_flags_quota_errors_and_learners() {
        let mut unhealthy = status(1, 10, 900);
        unhealthy.errors = vec!["NOSPACE".to_string()];
        unhealthy.is_learner = true;
        let answered = vec![("a:2379", &unhealthy)];

        let findings = evaluate(&answered, 1000);
        assert_eq!(
            findings,
            vec![
                "a:2379 db size 900 bytes exceeds 80% of the storage quota 1000 bytes",
                "a:2379 reported errors: NOSPACE",
                "a:2379 is a learner"
            ]
        );
    }

    #[test]
    fn test_unreachable_endpoint_is_reported() {
        let cluster = FakeCluster::new()
            .with_status("a:2379", status(1, 100, 0))
            .with_down_endpoint("b:2379");
        let checker = EpStatusChecker::new(cluster.agent(config(&["a:2379", "b:2379"])));

        let result = checker.check();
        assert_eq!(result.summary.len(), 1);
        assert!(result.summary[0].contains("context deadline exceeded"));
        assert!(result.statuses[1].status.is_none());
    }
}
