pub mod cluster;
pub mod config;
pub mod error;
pub mod revision;
mod util;

pub use cluster::{
    KeyValue, Member, MemberListResponse, RangeResponse, ResponseHeader, StatusResponse,
};
pub use config::GlobalConfig;
pub use error::DecodeError;
pub use revision::BucketKey;
pub use util::{base64_bytes, duration_ms, lenient_int};
