//! Certificate stores: the shared contract and the three backends.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::Settings;
use crate::error::{Result, StoreError};
use crate::platform::{self, Access};
use crate::tool::ToolRunner;

pub mod flat;
pub mod hashdir;
pub mod nssdb;

pub use flat::FlatStore;
pub use hashdir::HashDirStore;
pub use nssdb::NssDbStore;

/// Operations every certificate store supports.
pub trait CertStore {
    /// Short name used in reports.
    fn name(&self) -> &'static str;
    /// Install the certificate.
    fn add(&self, cert: &Path) -> Result<()>;
    /// Uninstall the certificate.
    fn remove(&self, cert: &Path) -> Result<()>;
    /// Whether the certificate is present. Absence is `Ok(false)`.
    fn check(&self, cert: &Path) -> Result<bool>;
}

/// Which backend a store is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// OpenSSL hashed directory (`<hash>.0` symlinks).
    OpenSsl,
    /// NSS database managed with certutil.
    Nss,
    /// Plain directory of certificate files.
    Flat,
}

impl StoreKind {
    pub fn name(self) -> &'static str {
        match self {
            StoreKind::OpenSsl => "openssl",
            StoreKind::Nss => "nss",
            StoreKind::Flat => "flat",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A configured store of any backend.
pub enum Store {
    HashDir(HashDirStore),
    NssDb(NssDbStore),
    Flat(FlatStore),
}

impl Store {
    /// Open the store of `kind` at the location given by `settings`.
    pub fn open(kind: StoreKind, settings: &Settings, runner: Arc<dyn ToolRunner>) -> Result<Store> {
        Ok(match kind {
            StoreKind::OpenSsl => Store::HashDir(HashDirStore::open(
                &settings.openssl_dir,
                &settings.openssl,
                runner,
            )?),
            StoreKind::Nss => Store::NssDb(NssDbStore::open(
                &settings.nss_db,
                &settings.certutil,
                &settings.openssl,
                runner,
            )?),
            StoreKind::Flat => Store::Flat(FlatStore::open(&settings.flat_dir)?),
        })
    }

    pub fn kind(&self) -> StoreKind {
        match self {
            Store::HashDir(_) => StoreKind::OpenSsl,
            Store::NssDb(_) => StoreKind::Nss,
            Store::Flat(_) => StoreKind::Flat,
        }
    }

    fn inner(&self) -> &dyn CertStore {
        match self {
            Store::HashDir(s) => s,
            Store::NssDb(s) => s,
            Store::Flat(s) => s,
        }
    }
}

impl CertStore for Store {
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn add(&self, cert: &Path) -> Result<()> {
        self.inner().add(cert)
    }

    fn remove(&self, cert: &Path) -> Result<()> {
        self.inner().remove(cert)
    }

    fn check(&self, cert: &Path) -> Result<bool> {
        self.inner().check(cert)
    }
}

/// A store root directory, checked for read/write/traverse access on open.
#[derive(Debug, Clone)]
pub struct StoreDir {
    root: PathBuf,
}

impl StoreDir {
    /// Validate `root` and bind to it.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::access(
                root,
                io::Error::new(io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        platform::check_access(&root, Access::DIR).map_err(|e| StoreError::access(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path inside the store named after the certificate's basename.
    pub fn entry_for(&self, cert: &Path) -> Result<PathBuf> {
        let name = cert.file_name().ok_or_else(|| {
            StoreError::access(
                cert,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;
        Ok(self.root.join(name))
    }

    /// Copy `cert` byte-for-byte into the store under its basename.
    pub fn copy(&self, cert: &Path) -> Result<PathBuf> {
        let dest = self.entry_for(cert)?;
        let mut src = fs::File::open(cert).map_err(|e| StoreError::access(cert, e))?;
        if dest.symlink_metadata().is_ok() {
            return Err(StoreError::AlreadyExists(dest.display().to_string()));
        }
        let mut out = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => {
                    StoreError::AlreadyExists(dest.display().to_string())
                }
                _ => StoreError::access(&dest, e),
            })?;
        if let Err(e) = io::copy(&mut src, &mut out) {
            drop(out);
            let _ = fs::remove_file(&dest);
            return Err(StoreError::access(&dest, e));
        }
        debug!(src = %cert.display(), dest = %dest.display(), "copied certificate");
        Ok(dest)
    }

    /// Whether the stored copy of `cert` has the same SHA-256 digest as `cert`.
    pub fn identical(&self, cert: &Path) -> Result<bool> {
        let stored = self.entry_for(cert)?;
        let theirs = sha256_file(cert)
            .map_err(|_| StoreError::NotFound(cert.display().to_string()))?;
        let ours = sha256_file(&stored)
            .map_err(|_| StoreError::NotFound(stored.display().to_string()))?;
        Ok(theirs == ours)
    }

    /// `identical`, turned into `Mismatch` when the files differ.
    pub(crate) fn ensure_identical(&self, cert: &Path) -> Result<PathBuf> {
        if self.identical(cert)? {
            self.entry_for(cert)
        } else {
            Err(StoreError::Mismatch {
                stored: self.entry_for(cert)?,
                reference: cert.to_path_buf(),
            })
        }
    }
}

fn sha256_file(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_vec())
}
