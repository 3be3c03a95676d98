use std::fmt;
use std::time::Duration;

/// Result type for kvdiag-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the store layer
#[derive(Debug)]
pub enum Error {
    /// IO operation failed
    Io(std::io::Error),

    /// Another process kept the file locked past the open timeout
    Locked(Duration),

    /// Neither meta page is valid
    InvalidMeta(&'static str),

    /// A page could not be parsed
    Corrupt { page: u64, detail: String },

    /// Requested bucket does not exist in the backend file
    MissingBucket(String),
}

impl Error {
    pub(crate) fn corrupt(page: u64, detail: impl Into<String>) -> Self {
        Error::Corrupt {
            page,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Locked(timeout) => write!(
                f,
                "Backend file is locked by another process (waited {:?}). Stop the member or retry later.",
                timeout
            ),
            Error::InvalidMeta(reason) => write!(f, "Not a valid backend file: {}", reason),
            Error::Corrupt { page, detail } => write!(f, "Corrupt page {}: {}", page, detail),
            Error::MissingBucket(name) => write!(f, "Bucket {:?} not found in backend", name),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Locked(_)
            | Error::InvalidMeta(_)
            | Error::Corrupt { .. }
            | Error::MissingBucket(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_error_message() {
        let msg = Error::Locked(Duration::from_secs(1)).to_string();
        assert!(msg.contains("locked by another process"));
        assert!(msg.contains("1s"));
    }

    #[test]
    fn test_corrupt_error_names_page() {
        let msg = Error::corrupt(12, "unexpected page flags 0x10").to_string();
        assert_eq!(msg, "Corrupt page 12: unexpected page flags 0x10");
    }
}
