use crate::error::DecodeError;
use serde::Serialize;
use std::fmt;

/// Width of an encoded revision: 8 bytes main, `_`, 8 bytes sub.
pub const REV_BYTES_LEN: usize = 8 + 1 + 8;

/// Width of an encoded revision followed by a one-byte marker.
pub const MARKED_REV_BYTES_LEN: usize = REV_BYTES_LEN + 1;

const SEPARATOR: u8 = b'_';
const TOMBSTONE_MARK: u8 = b't';

/// Physical key of the `key` bucket: the revision a write was assigned.
///
/// Both halves are stored big-endian so that byte order matches revision
/// order, which is what lets a forward cursor walk history in sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BucketKey {
    pub main: i64,
    pub sub: i64,
    pub tombstone: bool,
}

impl BucketKey {
    pub fn new(main: i64, sub: i64) -> Self {
        Self {
            main,
            sub,
            tombstone: false,
        }
    }

    pub fn tombstone(main: i64, sub: i64) -> Self {
        Self {
            main,
            sub,
            tombstone: true,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let tombstone = match bytes.len() {
            REV_BYTES_LEN => false,
            MARKED_REV_BYTES_LEN => match bytes[REV_BYTES_LEN] {
                TOMBSTONE_MARK => true,
                other => return Err(DecodeError::KeyMarker(other)),
            },
            len => return Err(DecodeError::KeyLength(len)),
        };

        if bytes[8] != SEPARATOR {
            return Err(DecodeError::KeySeparator(bytes[8]));
        }

        let mut main = [0u8; 8];
        let mut sub = [0u8; 8];
        main.copy_from_slice(&bytes[0..8]);
        sub.copy_from_slice(&bytes[9..17]);

        Ok(Self {
            main: i64::from_be_bytes(main),
            sub: i64::from_be_bytes(sub),
            tombstone,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MARKED_REV_BYTES_LEN);
        out.extend_from_slice(&self.main.to_be_bytes());
        out.push(SEPARATOR);
        out.extend_from_slice(&self.sub.to_be_bytes());
        if self.tombstone {
            out.push(TOMBSTONE_MARK);
        }
        out
    }
}

impl TryFrom<&[u8]> for BucketKey {
    type Error = DecodeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.main, self.sub)?;
        if self.tombstone {
            write!(f, "t")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_revision() {
        let mut raw = vec![0, 0, 0, 0, 0, 0, 0, 5, b'_'];
        raw.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 2]);

        let key = BucketKey::from_bytes(&raw).unwrap();
        assert_eq!(key, BucketKey::new(5, 2));
        assert_eq!(key.to_string(), "5_2");
    }

    #[test]
    fn test_decode_tombstone() {
        let raw = BucketKey::tombstone(9, 0).to_bytes();
        assert_eq!(raw.len(), MARKED_REV_BYTES_LEN);

        let key = BucketKey::from_bytes(&raw).unwrap();
        assert!(key.tombstone);
        assert_eq!(key.main, 9);
    }

    #[test]
    fn test_byte_order_matches_revision_order() {
        let low = BucketKey::new(2, 10).to_bytes();
        let high = BucketKey::new(256, 0).to_bytes();
        assert!(low < high);
    }

    #[test]
    fn test_rejects_short_key() {
        let err = BucketKey::from_bytes(b"short").unwrap_err();
        assert!(matches!(err, DecodeError::KeyLength(5)));
    }

    #[test]
    fn test_rejects_missing_separator() {
        let mut raw = BucketKey::new(1, 1).to_bytes();
        raw[8] = b'-';
        let err = BucketKey::from_bytes(&raw).unwrap_err();
        assert!(matches!(err, DecodeError::KeySeparator(b'-')));
    }

    #[test]
    fn test_rejects_unknown_marker() {
        let mut raw = BucketKey::new(1, 1).to_bytes();
        raw.push(b'x');
        let err = BucketKey::from_bytes(&raw).unwrap_err();
        assert!(matches!(err, DecodeError::KeyMarker(b'x')));
    }
}
