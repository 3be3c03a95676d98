use std::fmt;
use std::path::PathBuf;

/// Result type for kvdiag-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that end a diagnosis run
#[derive(Debug)]
pub enum Error {
    /// The aggregate report could not be serialized
    Serialize(serde_json::Error),

    /// The report could not be written to disk
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Serialize(err) => write!(f, "failed to marshal report: {}", err),
            Error::Write { path, source } => {
                write!(f, "failed to write report {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Serialize(err) => Some(err),
            Error::Write { source, .. } => Some(source),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialize(err)
    }
}
