//! NSS certificate database store, driven through `certutil`.
//!
//! Entries are keyed by nickname, which is the subject common name. A
//! certificate without a CN gets the empty nickname, so every such
//! certificate maps to the same entry.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{CertStore, StoreDir, StoreKind};
use crate::error::{Result, StoreError};
use crate::tool::{failure_detail, ToolRunner};

/// Trust flags: trusted CA for SSL, email and object signing.
pub const TRUST_FLAGS: &str = "C,C,C";

pub struct NssDbStore {
    db: StoreDir,
    db_arg: OsString,
    certutil: PathBuf,
    openssl: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl NssDbStore {
    pub fn open(
        db: impl Into<PathBuf>,
        certutil: impl Into<PathBuf>,
        openssl: impl Into<PathBuf>,
        runner: Arc<dyn ToolRunner>,
    ) -> Result<Self> {
        let db = StoreDir::open(db)?;
        let mut db_arg = OsString::from("sql:");
        db_arg.push(db.root());
        Ok(Self {
            db,
            db_arg,
            certutil: certutil.into(),
            openssl: openssl.into(),
            runner,
        })
    }

    pub fn db(&self) -> &Path {
        self.db.root()
    }

    /// Nickname for `cert`: its subject CN, or empty when it has none.
    pub fn nickname(&self, cert: &Path) -> Result<String> {
        let args = [
            OsStr::new("x509"),
            OsStr::new("-noout"),
            OsStr::new("-subject"),
            OsStr::new("-nameopt"),
            OsStr::new("compat"),
            OsStr::new("-in"),
            cert.as_os_str(),
        ];
        let subject = self.runner.run(&self.openssl, &args)?.into_stdout(&self.openssl)?;
        let nick = common_name(&subject);
        if nick.is_empty() {
            warn!(cert = %cert.display(), "certificate has no CN; using empty nickname");
        }
        debug!(cert = %cert.display(), nickname = %nick, "derived nickname");
        Ok(nick.to_string())
    }

    /// Whether `nickname` is registered in the database.
    pub fn contains(&self, nickname: &str) -> bool {
        let args = [
            OsStr::new("-d"),
            self.db_arg.as_os_str(),
            OsStr::new("-L"),
            OsStr::new("-n"),
            OsStr::new(nickname),
        ];
        match self.runner.run(&self.certutil, &args) {
            Ok(out) => out.success,
            Err(e) => {
                debug!(error = %e, "certutil query failed");
                false
            }
        }
    }
}

impl CertStore for NssDbStore {
    fn name(&self) -> &'static str {
        StoreKind::Nss.name()
    }

    fn add(&self, cert: &Path) -> Result<()> {
        let nick = self.nickname(cert)?;
        if self.contains(&nick) {
            return Err(StoreError::AlreadyExists(format!("nickname {nick:?}")));
        }
        let args = [
            OsStr::new("-d"),
            self.db_arg.as_os_str(),
            OsStr::new("-A"),
            OsStr::new("-n"),
            OsStr::new(&nick),
            OsStr::new("-t"),
            OsStr::new(TRUST_FLAGS),
            OsStr::new("-i"),
            cert.as_os_str(),
        ];
        self.runner
            .run(&self.certutil, &args)?
            .into_stdout(&self.certutil)?;
        info!(nickname = %nick, db = %self.db().display(), "added certificate");
        Ok(())
    }

    fn remove(&self, cert: &Path) -> Result<()> {
        let nick = self.nickname(cert)?;
        let args = [
            OsStr::new("-d"),
            self.db_arg.as_os_str(),
            OsStr::new("-D"),
            OsStr::new("-n"),
            OsStr::new(&nick),
        ];
        let out = self.runner.run(&self.certutil, &args)?;
        if !out.success {
            debug!(detail = %failure_detail(&out.stderr), "certutil delete failed");
            return Err(StoreError::NotFound(format!("nickname {nick:?}")));
        }
        info!(nickname = %nick, db = %self.db().display(), "removed certificate");
        Ok(())
    }

    fn check(&self, cert: &Path) -> Result<bool> {
        match self.nickname(cert) {
            Ok(nick) => Ok(self.contains(&nick)),
            Err(e) => {
                debug!(error = %e, "nickname lookup failed");
                Ok(false)
            }
        }
    }
}

/// Extract the first `CN=` value from a `/`-delimited subject line such as
/// `subject=/C=US/O=Example/CN=example.com`. Returns "" when there is none.
pub fn common_name(subject: &str) -> &str {
    let subject = subject.trim();
    let attrs = subject.strip_prefix("subject=").unwrap_or(subject);
    attrs
        .split('/')
        .map(str::trim)
        .find_map(|attr| attr.strip_prefix("CN="))
        .map(str::trim)
        .unwrap_or("")
}
