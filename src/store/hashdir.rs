//! OpenSSL hashed certificate directory.
//!
//! Each certificate is copied in under its basename and reached through a
//! `<subject hash>.0` symlink, the layout `c_rehash` produces. Only the `.0`
//! slot is used; colliding subject hashes are not probed.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{CertStore, StoreDir, StoreKind};
use crate::error::{Result, StoreError};
use crate::platform;
use crate::tool::ToolRunner;

pub struct HashDirStore {
    dir: StoreDir,
    openssl: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl HashDirStore {
    pub fn open(
        root: impl Into<PathBuf>,
        openssl: impl Into<PathBuf>,
        runner: Arc<dyn ToolRunner>,
    ) -> Result<Self> {
        Ok(Self {
            dir: StoreDir::open(root)?,
            openssl: openssl.into(),
            runner,
        })
    }

    /// Subject hash of `cert` as printed by `openssl x509 -hash`.
    pub fn subject_hash(&self, cert: &Path) -> Result<String> {
        let args = [
            OsStr::new("x509"),
            OsStr::new("-hash"),
            OsStr::new("-noout"),
            OsStr::new("-in"),
            cert.as_os_str(),
        ];
        let stdout = self.runner.run(&self.openssl, &args)?.into_stdout(&self.openssl)?;
        let hash = stdout.trim();
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::tool(
                self.openssl.display().to_string(),
                format!("unexpected hash output {hash:?}"),
            ));
        }
        debug!(cert = %cert.display(), hash, "subject hash");
        Ok(hash.to_string())
    }

    /// Path of the `<hash>.0` link for `cert`.
    pub fn link_for(&self, cert: &Path) -> Result<PathBuf> {
        let hash = self.subject_hash(cert)?;
        Ok(self.dir.root().join(format!("{hash}.0")))
    }

    fn link(&self, cert: &Path, stored: &Path) -> Result<PathBuf> {
        let link = self.link_for(cert)?;
        if link.symlink_metadata().is_ok() {
            return Err(StoreError::AlreadyExists(link.display().to_string()));
        }
        // Relative target keeps the directory relocatable.
        let target = stored.file_name().map(Path::new).unwrap_or(stored);
        platform::symlink(target, &link).map_err(|e| StoreError::access(&link, e))?;
        Ok(link)
    }

    /// Whether `link` is a symlink resolving to `stored`.
    fn links_to(&self, link: &Path, stored: &Path) -> bool {
        match fs::read_link(link) {
            Ok(target) => self.dir.root().join(target) == stored,
            Err(_) => false,
        }
    }
}

impl CertStore for HashDirStore {
    fn name(&self) -> &'static str {
        StoreKind::OpenSsl.name()
    }

    fn add(&self, cert: &Path) -> Result<()> {
        let stored = self.dir.copy(cert)?;
        match self.link(cert, &stored) {
            Ok(link) => {
                info!(cert = %stored.display(), link = %link.display(), "added certificate");
                Ok(())
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(&stored) {
                    warn!(path = %stored.display(), error = %rm, "could not roll back copy");
                }
                Err(e)
            }
        }
    }

    fn remove(&self, cert: &Path) -> Result<()> {
        let stored = self.dir.ensure_identical(cert)?;
        let link = self.link_for(cert)?;
        if self.links_to(&link, &stored) {
            fs::remove_file(&link).map_err(|e| StoreError::access(&link, e))?;
        } else if link.symlink_metadata().is_ok() {
            warn!(link = %link.display(), cert = %stored.display(), "link belongs to another certificate; leaving it");
        }
        fs::remove_file(&stored).map_err(|e| StoreError::access(&stored, e))?;
        info!(cert = %stored.display(), link = %link.display(), "removed certificate");
        Ok(())
    }

    fn check(&self, cert: &Path) -> Result<bool> {
        let stored = self.dir.entry_for(cert)?;
        if !platform::is_readable(&stored) {
            return Ok(false);
        }
        Ok(platform::is_readable(&self.link_for(cert)?))
    }
}
