//! Testing infrastructure for kvdiag integration tests.
//!
//! - `FakeCluster`: in-memory cluster serving as both client factory and SRV resolver
//! - `BoltFile`: writer for backend files in the member's on-disk page layout
//! - `StoreFixture`: backend files with chosen revisions, corrupt records included
//! - `TestWorld`: isolated working directory for CLI runs
//! - `capture_logs`: formatted log lines emitted while running a closure

pub mod bolt;
pub mod cluster;
pub mod fixtures;
pub mod logs;
pub mod world;

pub use bolt::BoltFile;
pub use cluster::FakeCluster;
pub use fixtures::StoreFixture;
pub use logs::capture_logs;
pub use world::TestWorld;
