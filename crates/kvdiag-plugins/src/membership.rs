use crate::resolve_endpoints;
use kvdiag_agent::Agent;
use kvdiag_engine::{DiagnosisResult, Plugin};
use kvdiag_types::Member;
use serde::Serialize;

const NAME: &str = "membershipChecker";

/// Asks every endpoint for the member list and checks that they agree.
pub struct MembershipChecker {
    agent: Agent,
}

#[derive(Debug, Serialize)]
pub struct MembershipResult {
    pub name: String,
    pub summary: Vec<String>,
    /// Every endpoint answered and all answers carry the same member IDs.
    pub consistent: bool,
    pub endpoints: Vec<EndpointMembers>,
}

#[derive(Debug, Serialize)]
pub struct EndpointMembers {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MembershipChecker {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    pub fn check(&self) -> MembershipResult {
        let mut result = MembershipResult {
            name: NAME.to_string(),
            summary: Vec::new(),
            consistent: false,
            endpoints: Vec::new(),
        };

        let Some(endpoints) = resolve_endpoints(&self.agent, &mut result.summary) else {
            return result;
        };

        let mut baseline: Option<(String, Vec<u64>)> = None;
        let mut consistent = true;

        for endpoint in endpoints {
            match self.agent.member_list(std::slice::from_ref(&endpoint)) {
                Ok(resp) => {
                    let ids = resp.member_ids();
                    if let Some((first, first_ids)) = &baseline {
                        if *first_ids != ids {
                            consistent = false;
                            result.summary.push(format!(
                                "member list from {} {:?} differs from {} {:?}",
                                endpoint, ids, first, first_ids
                            ));
                        }
                    } else {
                        baseline = Some((endpoint.clone(), ids));
                    }
                    result.endpoints.push(EndpointMembers {
                        endpoint,
                        members: resp.members,
                        error: None,
                    });
                }
                Err(err) => {
                    consistent = false;
                    result
                        .summary
                        .push(format!("failed to get member list from {}: {}", endpoint, err));
                    result.endpoints.push(EndpointMembers {
                        endpoint,
                        members: Vec::new(),
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        result.consistent = consistent && baseline.is_some();
        result
    }
}

impl Plugin for MembershipChecker {
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

    fn config(endpoints: &[&str]) -> GlobalConfig {
        GlobalConfig {
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_consistent_membership() {
        let cluster = FakeCluster::new()
            .with_member(1, "infra0", &["http://10.0.0.1:2379"])
            .with_member(2, "infra1", &["http://10.0.0.2:2379"]);
        let checker = MembershipChecker::new(cluster.agent(config(&["a:2379", "b:2379"])));

        let result = checker.check();
        assert!(result.consistent);
        assert!(result.summary.is_empty());
        assert_eq!(result.endpoints.len(), 2);
        assert_eq!(result.endpoints[1].members.len(), 2);
    }

    #[test]
    fn test_unreachable_endpoint_is_reported() {
        let cluster = FakeCluster::new()
            .with_member(1, "infra0", &["http://10.0.0.1:2379"])
            .with_down_endpoint("b:2379");
        let checker = MembershipChecker::new(cluster.agent(config(&["a:2379", "b:2379"])));

        let result = checker.check();
        assert!(!result.consistent);
        assert_eq!(result.summary.len(), 1);
        assert!(result.summary[0].starts_with("failed to get member list from b:2379"));
        assert!(result.endpoints[1].error.is_some());
    }

    #[test]
    fn test_resolution_failure_is_a_result() {
        let checker = MembershipChecker::new(FakeCluster::new().agent(config(&[])));

        let result = checker.check();
        assert!(!result.consistent);
        assert_eq!(
            result.summary,
            vec!["failed to resolve endpoints: no endpoints provided"]
        );

        let value = checker.diagnose().to_value().unwrap();
        assert_eq!(value["name"], "membershipChecker");
        assert_eq!(value["endpoints"], serde_json::json!([]));
    }
}
