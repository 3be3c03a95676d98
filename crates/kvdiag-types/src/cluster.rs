// Wire types exchanged with cluster members.
//
// Field names follow the cluster's JSON gateway, which keeps the original
// protobuf field names. `KeyValue` doubles as the on-disk value record of
// the `key` bucket, so it also derives the protobuf codec.

use crate::error::DecodeError;
use crate::util::{base64_bytes, lenient_int};
use prost::Message;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseHeader {
    #[serde(deserialize_with = "lenient_int::deserialize")]
    pub cluster_id: u64,
    #[serde(deserialize_with = "lenient_int::deserialize")]
    pub member_id: u64,
    #[serde(deserialize_with = "lenient_int::deserialize")]
    pub revision: i64,
    #[serde(deserialize_with = "lenient_int::deserialize")]
    pub raft_term: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Member {
    #[serde(rename = "ID", deserialize_with = "lenient_int::deserialize")]
    pub id: u64,
    pub name: String,
    #[serde(rename = "peerURLs")]
    pub peer_urls: Vec<String>,
    #[serde(rename = "clientURLs")]
    pub client_urls: Vec<String>,
    #[serde(rename = "isLearner")]
    pub is_learner: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberListResponse {
    pub header: ResponseHeader,
    pub members: Vec<Member>,
}

impl MemberListResponse {
    /// Member IDs in ascending order, for comparing views across endpoints.
    pub fn member_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.members.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusResponse {
    pub header: ResponseHeader,
    pub version: String,
    #[serde(rename = "dbSize", deserialize_with = "lenient_int::deserialize")]
    pub db_size: i64,
    #[serde(deserialize_with = "lenient_int::deserialize")]
    pub leader: u64,
    #[serde(rename = "raftIndex", deserialize_with = "lenient_int::deserialize")]
    pub raft_index: u64,
    #[serde(rename = "raftTerm", deserialize_with = "lenient_int::deserialize")]
    pub raft_term: u64,
    #[serde(
        rename = "raftAppliedIndex",
        deserialize_with = "lenient_int::deserialize"
    )]
    pub raft_applied_index: u64,
    pub errors: Vec<String>,
    #[serde(rename = "dbSizeInUse", deserialize_with = "lenient_int::deserialize")]
    pub db_size_in_use: i64,
    #[serde(rename = "isLearner")]
    pub is_learner: bool,
}

/// A single revision of a logical key.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyValue {
    #[prost(bytes = "vec", tag = "1")]
    #[serde(with = "base64_bytes")]
    pub key: Vec<u8>,
    #[prost(int64, tag = "2")]
    #[serde(deserialize_with = "lenient_int::deserialize")]
    pub create_revision: i64,
    #[prost(int64, tag = "3")]
    #[serde(deserialize_with = "lenient_int::deserialize")]
    pub mod_revision: i64,
    #[prost(int64, tag = "4")]
    #[serde(deserialize_with = "lenient_int::deserialize")]
    pub version: i64,
    #[prost(bytes = "vec", tag = "5")]
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
    #[prost(int64, tag = "6")]
    #[serde(deserialize_with = "lenient_int::deserialize")]
    pub lease: i64,
}

impl KeyValue {
    /// Decode a value blob from the `key` bucket.
    pub fn from_record(bytes: &[u8]) -> Result<Self, DecodeError> {
        let kv = KeyValue::decode(bytes)?;
        if kv.key.is_empty() {
            return Err(DecodeError::MissingKey);
        }
        Ok(kv)
    }

    pub fn to_record(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    pub fn key_lossy(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeResponse {
    pub header: ResponseHeader,
    pub kvs: Vec<KeyValue>,
    pub more: bool,
    #[serde(deserialize_with = "lenient_int::deserialize")]
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_list_from_gateway_json() {
        let body = r#"{
            "header": {"cluster_id": "14841639068965178418", "member_id": "10276657743932975437", "revision": "8", "raft_term": "2"},
            "members": [
                {"ID": "10276657743932975437", "name": "infra0", "peerURLs": ["http://10.0.0.1:2380"], "clientURLs": ["http://10.0.0.1:2379"]},
                {"ID": "3", "name": "infra1", "clientURLs": ["http://10.0.0.2:2379", "http://10.0.0.2:22379"], "isLearner": true}
            ]
        }"#;

        let resp: MemberListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.header.revision, 8);
        assert_eq!(resp.members.len(), 2);
        assert_eq!(resp.members[0].id, 10276657743932975437);
        assert_eq!(resp.members[1].client_urls.len(), 2);
        assert!(resp.members[1].is_learner);
        assert!(resp.members[1].peer_urls.is_empty());
        assert_eq!(resp.member_ids(), vec![3, 10276657743932975437]);
    }

    #[test]
    fn test_status_tolerates_omitted_fields() {
        let body = r#"{"version": "3.6.0", "dbSize": "24576", "leader": "7", "raftIndex": "12"}"#;
        let status: StatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(status.db_size, 24576);
        assert_eq!(status.leader, 7);
        assert_eq!(status.raft_applied_index, 0);
        assert!(status.errors.is_empty());
    }

    #[test]
    fn test_key_value_record_round_trip() {
        let kv = KeyValue {
            key: b"foo".to_vec(),
            create_revision: 2,
            mod_revision: 5,
            version: 3,
            value: b"bar".to_vec(),
            lease: 0,
        };

        let decoded = KeyValue::from_record(&kv.to_record()).unwrap();
        assert_eq!(decoded, kv);
        assert_eq!(decoded.key_lossy(), "foo");
    }

    #[test]
    fn test_key_value_record_rejects_garbage() {
        assert!(KeyValue::from_record(&[0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_key_value_record_requires_key() {
        let kv = KeyValue {
            value: b"orphan".to_vec(),
            ..Default::default()
        };
        let err = KeyValue::from_record(&kv.to_record()).unwrap_err();
        assert!(matches!(err, DecodeError::MissingKey));
    }

    #[test]
    fn test_range_response_decodes_base64() {
        let body = r#"{"kvs": [{"key": "aGVhbHRo", "value": "dHJ1ZQ==", "mod_revision": "4"}], "count": "1"}"#;
        let resp: RangeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.count, 1);
        assert_eq!(resp.kvs[0].key, b"health".to_vec());
        assert_eq!(resp.kvs[0].value, b"true".to_vec());
        assert_eq!(resp.kvs[0].mod_revision, 4);
    }
}
