use crate::resolve_endpoints;
use kvdiag_agent::Agent;
use kvdiag_engine::{DiagnosisResult, Plugin};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

const NAME: &str = "metricsChecker";

/// Metric families kept from each scrape.
pub const HEALTH_METRICS: &[&str] = &[
    "etcd_disk_wal_fsync_duration_seconds",
    "etcd_disk_backend_commit_duration_seconds",
    "etcd_network_peer_round_trip_time_seconds",
    "etcd_server_has_leader",
    "etcd_server_leader_changes_seen_total",
    "etcd_mvcc_db_total_size_in_bytes",
    "etcd_server_proposals_failed_total",
];

// A sample line of one of the kept families, histogram series included.
static SAMPLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    let families = HEALTH_METRICS.join("|");
    Regex::new(&format!(r"^(?:{})(?:_bucket|_sum|_count)?(?:\{{|\s)", families))
        .expect("metric family pattern is valid")
});

/// Scrapes every endpoint and keeps the health-related samples.
pub struct MetricsChecker {
    agent: Agent,
}

#[derive(Debug, Serialize)]
pub struct MetricsResult {
    pub name: String,
    pub summary: Vec<String>,
    pub endpoints: Vec<EndpointMetrics>,
}

#[derive(Debug, Serialize)]
pub struct EndpointMetrics {
    pub endpoint: String,
    pub metrics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetricsChecker {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    pub fn check(&self) -> MetricsResult {
        let mut result = MetricsResult {
            name: NAME.to_string(),
            summary: Vec::new(),
            endpoints: Vec::new(),
        };

        let Some(endpoints) = resolve_endpoints(&self.agent, &mut result.summary) else {
            return result;
        };

        for endpoint in endpoints {
            match self.agent.metrics(&endpoint) {
                Ok(lines) => result.endpoints.push(EndpointMetrics {
                    endpoint,
                    metrics: filter_health_metrics(&lines),
                    error: None,
                }),
                Err(err) => {
                    result
                        .summary
                        .push(format!("failed to fetch metrics from {}: {}", endpoint, err));
                    result.endpoints.push(EndpointMetrics {
                        endpoint,
                        metrics: Vec::new(),
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        result
    }
}

pub fn filter_health_metrics(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| SAMPLE_LINE.is_match(line))
        .cloned()
        .collect()
}

impl Plugin for MetricsChecker {
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

    const EXPOSITION: &str = "\
# HELP etcd_server_has_leader Whether or not a leader exists.
# TYPE etcd_server_has_leader gauge
etcd_server_has_leader 1
etcd_server_has_leader_extra 7
etcd_disk_wal_fsync_duration_seconds_bucket{le=\"0.001\"} 12
etcd_disk_wal_fsync_duration_seconds_sum 0.5
go_goroutines 42
etcd_mvcc_db_total_size_in_bytes 24576
";

    fn lines(text: &str) -> Vec<String> {
        text.split('\n').map(str::to_string).collect()
    }

    #[test]
    fn test_filter_keeps_health_families() {
        assert_eq!(
            filter_health_metrics(&lines(EXPOSITION)),
            vec![
                "etcd_server_has_leader 1",
                "etcd_disk_wal_fsync_duration_seconds_bucket{le=\"0.001\"} 12",
                "etcd_disk_wal_fsync_duration_seconds_sum 0.5",
                "etcd_mvcc_db_total_size_in_bytes 24576",
            ]
        );
    }

    #[test]
    fn test_scrapes_each_endpoint() {
        let cluster = FakeCluster::new()
            .with_metrics("a:2379", EXPOSITION)
            .with_down_endpoint("b:2379");
        let checker = MetricsChecker::new(cluster.agent(GlobalConfig {
            endpoints: vec!["a:2379".to_string(), "b:2379".to_string()],
            ..Default::default()
        }));

        let result = checker.check();
        assert_eq!(result.endpoints[0].metrics.len(), 4);
        assert!(result.endpoints[1].error.is_some());
        assert_eq!(result.summary.len(), 1);
        assert!(result.summary[0].starts_with("failed to fetch metrics from b:2379"));
    }
}
