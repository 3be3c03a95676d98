use crate::{Error, Result};
use tracing::debug;

const CLIENT_SERVICE: &str = "etcd-client";

/// One SRV answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvTarget {
    pub host: String,
    pub port: u16,
}

/// DNS SRV lookups, kept behind a trait so discovery can run without DNS.
pub trait SrvResolver: Send + Sync {
    /// Resolve a fully built record name such as `_etcd-client._tcp.example.com`.
    fn lookup_srv(&self, name: &str) -> Result<Vec<SrvTarget>>;
}

/// Resolver using the host's DNS configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSrvResolver;

impl SrvResolver for SystemSrvResolver {
    fn lookup_srv(&self, name: &str) -> Result<Vec<SrvTarget>> {
        let resolver = hickory_resolver::Resolver::from_system_conf()
            .map_err(|e| Error::Discovery(format!("failed to load resolver config: {}", e)))?;
        let lookup = resolver
            .srv_lookup(name)
            .map_err(|e| Error::Discovery(format!("{}: {}", name, e)))?;

        Ok(lookup
            .iter()
            .map(|srv| SrvTarget {
                host: srv.target().to_utf8(),
                port: srv.port(),
            })
            .collect())
    }
}

/// SRV service label for a scheme, e.g. `etcd-client-ssl-prod`.
pub fn srv_service(service: &str, service_name: Option<&str>, scheme: &str) -> String {
    let mut label = service.to_string();
    if scheme == "https" {
        label.push_str("-ssl");
    }
    if let Some(name) = service_name.filter(|n| !n.is_empty()) {
        label.push('-');
        label.push_str(name);
    }
    label
}

/// Client endpoints advertised for `domain`, secure records first.
///
/// Fails only when both the https and http lookups fail.
pub fn discover_client_endpoints(
    resolver: &dyn SrvResolver,
    domain: &str,
    service_name: Option<&str>,
) -> Result<Vec<String>> {
    let mut endpoints = Vec::new();
    let mut errors = Vec::new();

    for scheme in ["https", "http"] {
        let record = format!(
            "_{}._tcp.{}",
            srv_service(CLIENT_SERVICE, service_name, scheme),
            domain
        );
        match resolver.lookup_srv(&record) {
            Ok(targets) => {
                debug!(record = %record, count = targets.len(), "SRV lookup succeeded");
                endpoints.extend(targets.into_iter().map(|t| {
                    format!("{}://{}:{}", scheme, t.host.trim_end_matches('.'), t.port)
                }));
            }
            Err(err) => errors.push(err.to_string()),
        }
    }

    if errors.len() == 2 {
        return Err(Error::Discovery(format!(
            "dns lookup errors: {} and {}",
            errors[0], errors[1]
        )));
    }

    Ok(endpoints)
}
