// Serde adapters shared by the config and wire types.
//
// The cluster's JSON gateway encodes 64-bit integers as strings and byte
// fields as base64, while the report and config files want plain numbers.

/// `Duration` <-> integer milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Accepts an integer written either as a JSON number or as a string.
///
/// Serialization is left to the field's own type, so only use this with
/// `deserialize_with`.
pub mod lenient_int {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr<T> {
        Number(T),
        Text(String),
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr + Deserialize<'de>,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        match Repr::<T>::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(s) => s.parse::<T>().map_err(D::Error::custom),
        }
    }
}

/// `Vec<u8>` <-> standard base64 string.
pub mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        #[serde(with = "super::duration_ms")]
        timeout: Duration,
        #[serde(deserialize_with = "super::lenient_int::deserialize")]
        revision: i64,
        #[serde(with = "super::base64_bytes")]
        key: Vec<u8>,
    }

    #[test]
    fn test_lenient_int_accepts_string_and_number() {
        let from_string: Sample =
            serde_json::from_str(r#"{"timeout":1500,"revision":"42","key":"Zm9v"}"#).unwrap();
        let from_number: Sample =
            serde_json::from_str(r#"{"timeout":1500,"revision":42,"key":"Zm9v"}"#).unwrap();

        assert_eq!(from_string, from_number);
        assert_eq!(from_string.timeout, Duration::from_millis(1500));
        assert_eq!(from_string.key, b"foo".to_vec());
    }

    #[test]
    fn test_lenient_int_rejects_garbage() {
        let err = serde_json::from_str::<Sample>(r#"{"timeout":1,"revision":"x1","key":""}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_serialize_uses_plain_forms() {
        let sample = Sample {
            timeout: Duration::from_secs(2),
            revision: 7,
            key: b"a".to_vec(),
        };
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["timeout"], 2000);
        assert_eq!(json["revision"], 7);
        assert_eq!(json["key"], "YQ==");
    }
}
