use std::fmt;
use std::path::PathBuf;

/// Result type for kvdiag-offline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that stop an offline analysis
#[derive(Debug)]
pub enum Error {
    /// Backend file exists but could not be opened or scanned
    Store {
        path: PathBuf,
        source: kvdiag_store::Error,
    },

    /// IO operation failed (existence check, writing the statistics)
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store { path, source } => {
                write!(f, "Failed to open db: {}, error: {}", path.display(), source)
            }
            Error::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store { source, .. } => Some(source),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
