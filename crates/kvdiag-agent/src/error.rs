use std::fmt;
use std::time::Duration;

/// Result type for kvdiag-agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while talking to the cluster
#[derive(Debug)]
pub enum Error {
    /// Neither discovery nor configuration produced an endpoint
    NoEndpoints,

    /// Request could not be sent or its response could not be read
    Transport(reqwest::Error),

    /// Member answered with a non-success status
    Status {
        endpoint: String,
        code: u16,
        body: String,
    },

    /// Per-command deadline elapsed before the request completed
    DeadlineExceeded(Duration),

    /// DNS SRV discovery failed
    Discovery(String),

    /// TLS material could not be loaded or is incomplete
    Tls(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoEndpoints => write!(f, "no endpoints provided"),
            Error::Transport(err) => write!(f, "Transport error: {}", err),
            Error::Status {
                endpoint,
                code,
                body,
            } => write!(f, "{} responded with status {}: {}", endpoint, code, body),
            Error::DeadlineExceeded(timeout) => {
                write!(f, "context deadline exceeded after {:?}", timeout)
            }
            Error::Discovery(msg) => write!(f, "Discovery error: {}", msg),
            Error::Tls(msg) => write!(f, "TLS error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(err) => Some(err),
            Error::NoEndpoints
            | Error::Status { .. }
            | Error::DeadlineExceeded(_)
            | Error::Discovery(_)
            | Error::Tls(_) => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_endpoints_message() {
        assert_eq!(Error::NoEndpoints.to_string(), "no endpoints provided");
    }

    #[test]
    fn test_status_message_names_endpoint() {
        let err = Error::Status {
            endpoint: "http://10.0.0.1:2379".to_string(),
            code: 401,
            body: "invalid auth token".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("10.0.0.1:2379"));
        assert!(msg.contains("401"));
    }
}
