use crate::resolve_endpoints;
use kvdiag_agent::{Agent, ReadOptions};
use kvdiag_engine::{DiagnosisResult, Plugin};
use kvdiag_types::duration_ms;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Key read by the probe. It does not need to exist.
pub const PROBE_KEY: &str = "health";

/// Reads a probe key through every endpoint and times each read.
pub struct ReadChecker {
    agent: Agent,
    options: ReadOptions,
}

#[derive(Debug, Serialize)]
pub struct ReadResult {
    pub name: String,
    pub summary: Vec<String>,
    pub key: String,
    pub serializable: bool,
    pub checks: Vec<ReadCheck>,
}

#[derive(Debug, Serialize)]
pub struct ReadCheck {
    pub endpoint: String,
    #[serde(rename = "took_ms", with = "duration_ms")]
    pub took: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReadChecker {
    pub fn serializable(agent: Agent) -> Self {
        Self {
            agent,
            options: ReadOptions::serializable(),
        }
    }

    pub fn linearizable(agent: Agent) -> Self {
        Self {
            agent,
            options: ReadOptions::linearizable(),
        }
    }

    pub fn check(&self) -> ReadResult {
        let mut result = ReadResult {
            name: self.name().to_string(),
            summary: Vec::new(),
            key: PROBE_KEY.to_string(),
            serializable: self.options.serializable,
            checks: Vec::new(),
        };

        let Some(endpoints) = resolve_endpoints(&self.agent, &mut result.summary) else {
            return result;
        };

        for endpoint in endpoints {
            let start = Instant::now();
            let outcome = self
                .agent
                .read(std::slice::from_ref(&endpoint), PROBE_KEY, self.options);
            let took = start.elapsed();

            match outcome {
                Ok(resp) => result.checks.push(ReadCheck {
                    endpoint,
                    took,
                    revision: Some(resp.header.revision),
                    error: None,
                }),
                Err(err) => {
                    result.summary.push(format!(
                        "failed to read {:?} from {}: {}",
                        PROBE_KEY, endpoint, err
                    ));
                    result.checks.push(ReadCheck {
                        endpoint,
                        took,
                        revision: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        result
    }
}

impl Plugin for ReadChecker {
    fn name(&self) -> &str {
        if self.options.serializable {
            "serializableReadChecker"
        } else {
            "linearizableReadChecker"
        }
    }

    fn diagnose(&self) -> Box<dyn DiagnosisResult> {
        Box::new(self.check())
    }
}
