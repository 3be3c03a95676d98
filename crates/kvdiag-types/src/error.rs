use std::fmt;

/// Errors raised while decoding raw records from the backend store.
#[derive(Debug)]
pub enum DecodeError {
    /// Bucket key has the wrong width
    KeyLength(usize),

    /// Byte between the main and sub revision is not `_`
    KeySeparator(u8),

    /// Trailing byte of a marked key is not a known marker
    KeyMarker(u8),

    /// Value bytes are not a valid `KeyValue` record
    Value(prost::DecodeError),

    /// Value decoded but carries no logical key
    MissingKey,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::KeyLength(len) => {
                write!(f, "invalid bucket key length {} (expected 17 or 18)", len)
            }
            DecodeError::KeySeparator(byte) => {
                write!(f, "invalid bucket key separator 0x{:02x}", byte)
            }
            DecodeError::KeyMarker(byte) => write!(f, "unknown bucket key marker 0x{:02x}", byte),
            DecodeError::Value(err) => write!(f, "invalid key-value record: {}", err),
            DecodeError::MissingKey => write!(f, "key-value record has an empty key"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Value(err) => Some(err),
            _ => None,
        }
    }
}

impl From<prost::DecodeError> for DecodeError {
    fn from(err: prost::DecodeError) -> Self {
        DecodeError::Value(err)
    }
}
