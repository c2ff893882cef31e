//! Unix implementations backed by access(2) and std symlinks.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Permission bits passed to access(2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access(libc::c_int);

impl Access {
    pub const READ: Access = Access(libc::R_OK);

    /// Read, write and traverse; what a store root needs.
    pub const DIR: Access = Access(libc::R_OK | libc::W_OK | libc::X_OK);
}

/// Check that the calling user has `mode` on `path` (follows symlinks).
pub fn check_access(path: &Path, mode: Access) -> io::Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    let rc = unsafe { libc::access(c_path.as_ptr(), mode.0) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// True if `path` exists and is readable.
pub fn is_readable(path: &Path) -> bool {
    check_access(path, Access::READ).is_ok()
}

/// Create `link` pointing at `target`.
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}
