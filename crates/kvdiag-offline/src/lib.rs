// Offline analysis of a member's backend file.
//
// The `key` bucket is ordered by revision, not by logical key, so per-key
// history is rebuilt with one full scan and regrouped in memory.

mod analyzer;
mod error;
mod stats;

pub use analyzer::{Analysis, Outcome, analyze, analyze_offline};
pub use error::{Error, Result};
pub use stats::{KeyRevisionIndex, KeyStat, write_stats};
