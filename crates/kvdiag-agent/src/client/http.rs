// Client over the members' JSON gateway.
//
// The gateway mirrors the gRPC API under /v3: requests are POSTed as JSON,
// byte fields travel as base64 and 64-bit integers as strings.

use super::{
    ClientFactory, ClientSpec, ClusterClient, CommandDeadline, ReadOptions, normalize_endpoint,
};
use crate::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use kvdiag_types::{MemberListResponse, RangeResponse, StatusResponse};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Certificate, Identity};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::cell::OnceCell;
use tracing::debug;

const MEMBER_LIST_PATH: &str = "/v3/cluster/member/list";
const STATUS_PATH: &str = "/v3/maintenance/status";
const RANGE_PATH: &str = "/v3/kv/range";
const AUTHENTICATE_PATH: &str = "/v3/auth/authenticate";
const METRICS_PATH: &str = "/metrics";

#[derive(Debug, Default, Clone, Copy)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn connect(&self, spec: &ClientSpec) -> Result<Box<dyn ClusterClient>> {
        Ok(Box::new(HttpClusterClient::new(spec)?))
    }
}

pub struct HttpClusterClient {
    http: Client,
    endpoints: Vec<String>,
    insecure_transport: bool,
    credentials: Option<(String, String)>,
    token: OnceCell<String>,
}

#[derive(Deserialize)]
struct AuthenticateResponse {
    #[serde(default)]
    token: String,
}

impl HttpClusterClient {
    pub fn new(spec: &ClientSpec) -> Result<Self> {
        if spec.endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }

        Ok(Self {
            http: build_http_client(spec)?,
            endpoints: spec
                .endpoints
                .iter()
                .map(|ep| normalize_endpoint(ep, spec.insecure_transport))
                .collect(),
            insecure_transport: spec.insecure_transport,
            credentials: spec.credentials.clone(),
            token: OnceCell::new(),
        })
    }

    fn authorize(
        &self,
        endpoint: &str,
        request: RequestBuilder,
        deadline: &CommandDeadline,
    ) -> Result<RequestBuilder> {
        let Some((name, password)) = &self.credentials else {
            return Ok(request);
        };

        if self.token.get().is_none() {
            let resp: AuthenticateResponse = self.send(
                endpoint,
                self.http
                    .post(format!("{}{}", endpoint, AUTHENTICATE_PATH))
                    .json(&json!({ "name": name, "password": password })),
                deadline,
            )?;
            let _ = self.token.set(resp.token);
        }

        match self.token.get() {
            Some(token) => Ok(request.header(reqwest::header::AUTHORIZATION, token.as_str())),
            None => Ok(request),
        }
    }

    fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
        deadline: &CommandDeadline,
    ) -> Result<T> {
        let resp = request.timeout(deadline.remaining()?).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                endpoint: endpoint.to_string(),
                code: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        Ok(resp.json::<T>()?)
    }

    fn post_to<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        body: &Value,
        deadline: &CommandDeadline,
    ) -> Result<T> {
        let request = self.http.post(format!("{}{}", endpoint, path)).json(body);
        let request = self.authorize(endpoint, request, deadline)?;
        self.send(endpoint, request, deadline)
    }

    /// Try each endpoint in order; the first one that answers wins.
    fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        deadline: &CommandDeadline,
    ) -> Result<T> {
        let mut last_err = Error::NoEndpoints;
        for endpoint in &self.endpoints {
            match self.post_to(endpoint, path, body, deadline) {
                Ok(resp) => return Ok(resp),
                Err(Error::Transport(err)) => {
                    debug!(endpoint = %endpoint, error = %err, "endpoint unreachable, trying next");
                    last_err = Error::Transport(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err)
    }
}

impl ClusterClient for HttpClusterClient {
    fn member_list(&self, deadline: &CommandDeadline) -> Result<MemberListResponse> {
        self.post(MEMBER_LIST_PATH, &json!({ "linearizable": true }), deadline)
    }

    fn status(&self, endpoint: &str, deadline: &CommandDeadline) -> Result<StatusResponse> {
        let endpoint = normalize_endpoint(endpoint, self.insecure_transport);
        self.post_to(&endpoint, STATUS_PATH, &json!({}), deadline)
    }

    fn get(
        &self,
        key: &str,
        options: ReadOptions,
        deadline: &CommandDeadline,
    ) -> Result<RangeResponse> {
        let body = json!({
            "key": STANDARD.encode(key.as_bytes()),
            "serializable": options.serializable,
        });
        self.post(RANGE_PATH, &body, deadline)
    }

    fn metrics(&self, endpoint: &str, deadline: &CommandDeadline) -> Result<String> {
        let url = format!("{}{}", normalize_endpoint(endpoint, true), METRICS_PATH);
        let resp = self.http.get(&url).timeout(deadline.remaining()?).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                endpoint: url,
                code: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        Ok(resp.text()?)
    }
}

/// HTTP client carrying the connection timeouts and TLS material.
fn build_http_client(spec: &ClientSpec) -> Result<Client> {
    let mut builder = Client::builder()
        .use_rustls_tls()
        .connect_timeout(spec.dial_timeout)
        .tcp_keepalive(spec.keepalive_time)
        .pool_idle_timeout(spec.keepalive_timeout)
        .danger_accept_invalid_certs(spec.insecure_skip_verify);

    if let Some(ca_file) = &spec.ca_file {
        let pem = std::fs::read(ca_file).map_err(|e| {
            Error::Tls(format!("failed to load CA {}: {}", ca_file.display(), e))
        })?;
        let ca = Certificate::from_pem(&pem)
            .map_err(|e| Error::Tls(format!("invalid CA {}: {}", ca_file.display(), e)))?;
        builder = builder.add_root_certificate(ca);
    }

    match (&spec.cert_file, &spec.key_file) {
        (Some(cert_file), Some(key_file)) => {
            let mut pem = std::fs::read(cert_file).map_err(|e| {
                Error::Tls(format!(
                    "failed to load certificate {}: {}",
                    cert_file.display(),
                    e
                ))
            })?;
            let key = std::fs::read(key_file).map_err(|e| {
                Error::Tls(format!("failed to load key {}: {}", key_file.display(), e))
            })?;
            pem.push(b'\n');
            pem.extend_from_slice(&key);
            let identity = Identity::from_pem(&pem)
                .map_err(|e| Error::Tls(format!("invalid client certificate or key: {}", e)))?;
            builder = builder.identity(identity);
        }
        (None, None) => {}
        _ => {
            return Err(Error::Tls(
                "client certificate and key must be given together".to_string(),
            ));
        }
    }

    Ok(builder.build()?)
}
