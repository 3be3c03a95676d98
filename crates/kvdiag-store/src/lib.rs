// Backend store of a cluster member.
//
// The member keeps every bucket in one paged B+tree file. It is read here
// directly, without any server in between, and never written.

mod backend;
mod error;
mod lock;
pub mod page;
mod path;

pub use backend::{Backend, DEFAULT_OPEN_TIMEOUT, KEY_BUCKET};
pub use error::{Error, Result};
pub use path::backend_path;
