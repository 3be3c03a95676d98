use std::path::{Path, PathBuf};

const MEMBER_DIR: &str = "member";
const SNAP_DIR: &str = "snap";
const BACKEND_FILE: &str = "db";

fn member_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(MEMBER_DIR)
}

fn snap_dir(data_dir: &Path) -> PathBuf {
    member_dir(data_dir).join(SNAP_DIR)
}

/// Backend file a member keeps under its data directory: `<data-dir>/member/snap/db`.
///
/// Live members and offline analysis must agree on this path.
pub fn backend_path(data_dir: &Path) -> PathBuf {
    snap_dir(data_dir).join(BACKEND_FILE)
}
