// Endpoint resolution.
//
// `endpoints()` serves the checks: the configured list, or every member's
// client URLs when cluster mode is on. `endpoints_from_cmd()` is what the
// member-list request itself is sent to: DNS discovery first, then the
// configured list.

use crate::agent::Agent;
use crate::discovery::discover_client_endpoints;
use crate::{Error, Result};
use tracing::warn;

const INSECURE_SCHEME: &str = "http://";

impl Agent {
    pub fn endpoints(&self) -> Result<Vec<String>> {
        if !self.config().use_cluster_endpoints {
            if self.config().endpoints.is_empty() {
                return Err(Error::NoEndpoints);
            }
            return Ok(self.config().endpoints.clone());
        }

        self.endpoints_from_cluster()
    }

    fn endpoints_from_cluster(&self) -> Result<Vec<String>> {
        let resp = self.member_list(&[])?;

        let endpoints: Vec<String> = resp
            .members
            .iter()
            .flat_map(|m| m.client_urls.iter().cloned())
            .collect();

        if endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }
        Ok(endpoints)
    }

    pub fn endpoints_from_cmd(&self) -> Result<Vec<String>> {
        let mut endpoints = self.endpoints_from_dns()?;

        if endpoints.is_empty() {
            endpoints = self.config().endpoints.clone();
        }

        if endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }
        Ok(endpoints)
    }

    fn endpoints_from_dns(&self) -> Result<Vec<String>> {
        let Some(domain) = self.config().discovery_domain() else {
            return Ok(Vec::new());
        };

        let discovered = discover_client_endpoints(
            self.resolver(),
            domain,
            self.config().dns_service.as_deref(),
        )?;

        if self.config().insecure_discovery {
            return Ok(discovered);
        }

        Ok(discovered
            .into_iter()
            .filter(|ep| {
                if ep.starts_with(INSECURE_SCHEME) {
                    warn!("ignoring discovered insecure endpoint {:?}", ep);
                    return false;
                }
                true
            })
            .collect())
    }
}
