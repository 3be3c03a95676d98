use crate::{Error, Result};
use std::fs::File;
use std::time::Duration;

#[cfg(unix)]
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Take a shared advisory lock on `file`, waiting at most `timeout` for a
/// writer holding the exclusive lock. Released when the file is closed.
#[cfg(unix)]
pub(crate) fn lock_shared(file: &File, timeout: Duration) -> Result<()> {
    use std::os::unix::io::AsRawFd;
    use std::time::Instant;

    let start = Instant::now();
    loop {
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_SH | libc::LOCK_NB) };
        if rc == 0 {
            return Ok(());
        }

        let err = std::io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) => continue,
            Some(libc::EWOULDBLOCK) => {}
            _ => return Err(Error::Io(err)),
        }

        if start.elapsed() >= timeout {
            return Err(Error::Locked(timeout));
        }
        std::thread::sleep(RETRY_INTERVAL);
    }
}

#[cfg(not(unix))]
pub(crate) fn lock_shared(_file: &File, _timeout: Duration) -> Result<()> {
    Ok(())
}
