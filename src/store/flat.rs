//! Flat directory store: certificates as plain files named by basename.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::{CertStore, StoreDir, StoreKind};
use crate::error::{Result, StoreError};
use crate::platform;

pub struct FlatStore {
    dir: StoreDir,
}

impl FlatStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            dir: StoreDir::open(root)?,
        })
    }
}

impl CertStore for FlatStore {
    fn name(&self) -> &'static str {
        StoreKind::Flat.name()
    }

    fn add(&self, cert: &Path) -> Result<()> {
        let dest = self.dir.copy(cert)?;
        info!(dest = %dest.display(), "added certificate");
        Ok(())
    }

    fn remove(&self, cert: &Path) -> Result<()> {
        let stored = self.dir.ensure_identical(cert)?;
        fs::remove_file(&stored).map_err(|e| StoreError::access(&stored, e))?;
        info!(path = %stored.display(), "removed certificate");
        Ok(())
    }

    fn check(&self, cert: &Path) -> Result<bool> {
        Ok(platform::is_readable(&self.dir.entry_for(cert)?))
    }
}
