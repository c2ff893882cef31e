//! Configuration loading and store location defaults.
//!
//! Precedence: command-line flags, then the config file, then the built-in
//! defaults. TRUSTCTL_CONFIG overrides the config file location.

use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Default OpenSSL hashed certificate directory.
pub const DEFAULT_OPENSSL_DIR: &str = "/etc/ssl/certs";
/// Default flat certificate directory.
pub const DEFAULT_FLAT_DIR: &str = "/usr/local/share/ca-certificates";
/// NSS database relative to the home directory.
pub const DEFAULT_NSS_DB_IN_HOME: &str = ".pki/nssdb";

/// Contents of config.toml. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub openssl_dir: Option<PathBuf>,
    pub nss_db: Option<PathBuf>,
    pub flat_dir: Option<PathBuf>,
    pub openssl: Option<PathBuf>,
    pub certutil: Option<PathBuf>,
}

impl FileConfig {
    /// Load from `path` (with shared lock). The file must exist.
    pub fn load(path: &Path) -> Result<FileConfig> {
        if !path.is_file() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        let mut file = fs::OpenOptions::new()
            .read(true)
            .open(path)
            .with_context(|| format!("open config: {}", path.display()))?;
        fs2::FileExt::lock_shared(&file)?;
        let mut s = String::new();
        file.read_to_string(&mut s)?;
        let cfg: FileConfig =
            toml::from_str(&s).with_context(|| format!("parse config: {}", path.display()))?;
        Ok(cfg)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<FileConfig> {
        if path.exists() {
            FileConfig::load(path)
        } else {
            Ok(FileConfig::default())
        }
    }
}

/// Config file path: TRUSTCTL_CONFIG, else the per-user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("TRUSTCTL_CONFIG") {
        return Some(PathBuf::from(path));
    }
    directories::ProjectDirs::from("org", "trustctl", "trustctl")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Resolved store locations and tool paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub openssl_dir: PathBuf,
    pub nss_db: PathBuf,
    pub flat_dir: PathBuf,
    pub openssl: PathBuf,
    pub certutil: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let nss_db = match directories::BaseDirs::new() {
            Some(dirs) => dirs.home_dir().join(DEFAULT_NSS_DB_IN_HOME),
            None => PathBuf::from(DEFAULT_NSS_DB_IN_HOME),
        };
        Self {
            openssl_dir: PathBuf::from(DEFAULT_OPENSSL_DIR),
            nss_db,
            flat_dir: PathBuf::from(DEFAULT_FLAT_DIR),
            openssl: PathBuf::from("openssl"),
            certutil: PathBuf::from("certutil"),
        }
    }
}

impl Settings {
    /// Defaults with any values from `file` applied on top.
    pub fn from_file(file: &FileConfig) -> Self {
        let mut s = Settings::default();
        s.apply(file);
        s
    }

    /// Overwrite every field that `overrides` sets.
    pub fn apply(&mut self, overrides: &FileConfig) {
        let FileConfig {
            openssl_dir,
            nss_db,
            flat_dir,
            openssl,
            certutil,
        } = overrides.clone();
        if let Some(p) = openssl_dir {
            self.openssl_dir = p;
        }
        if let Some(p) = nss_db {
            self.nss_db = p;
        }
        if let Some(p) = flat_dir {
            self.flat_dir = p;
        }
        if let Some(p) = openssl {
            self.openssl = p;
        }
        if let Some(p) = certutil {
            self.certutil = p;
        }
    }
}
