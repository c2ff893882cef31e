//! Platform helpers for filesystem permission checks and symlinks.

#[cfg(unix)]
pub mod unix;

#[cfg(unix)]
pub use unix::{check_access, is_readable, symlink, Access};
