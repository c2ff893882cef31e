//! Shared test helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use tempfile::TempDir;
use trustctl::error::{Result, StoreError};
use trustctl::tool::{ToolOutput, ToolRunner};

/// Create a temp directory under the current dir.
pub fn temp_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("trustctl_test_")
        .tempdir_in(std::env::current_dir().unwrap_or_else(|_| Path::new(".").into()))
        .expect("temp dir")
}

/// Create `dir/name` and return its path.
pub fn mkdir(dir: &Path, name: &str) -> PathBuf {
    let p = dir.join(name);
    fs::create_dir_all(&p).unwrap();
    p
}

/// Write a fake certificate whose subject line the fake openssl reports.
pub fn write_cert(dir: &Path, name: &str, subject: &str) -> PathBuf {
    let p = dir.join(name);
    fs::write(
        &p,
        format!("-----BEGIN CERTIFICATE-----\nsubject={subject}\n-----END CERTIFICATE-----\n"),
    )
    .unwrap();
    p
}

/// Hash the fake openssl prints: first 4 bytes of the SHA-256 of the subject line.
pub fn fake_hash(cert: &Path) -> String {
    let subject = subject_line(cert).unwrap_or_default();
    Sha256::digest(subject.as_bytes())[..4]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn subject_line(cert: &Path) -> Option<String> {
    let content = fs::read_to_string(cert).ok()?;
    content
        .lines()
        .find(|l| l.starts_with("subject="))
        .map(str::to_string)
}

fn ok(stdout: impl Into<String>) -> ToolOutput {
    ToolOutput {
        success: true,
        stdout: stdout.into(),
        stderr: String::new(),
    }
}

fn fail(stderr: impl Into<String>) -> ToolOutput {
    ToolOutput {
        success: false,
        stdout: String::new(),
        stderr: stderr.into(),
    }
}

/// Emulates `openssl x509` and `certutil` against an in-memory database.
#[derive(Default)]
pub struct FakeTools {
    /// nickname -> certificate bytes
    db: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<Vec<String>>>,
    /// When set, every openssl call fails.
    pub openssl_broken: bool,
}

impl FakeTools {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn broken_openssl() -> Arc<Self> {
        Arc::new(Self {
            openssl_broken: true,
            ..Self::default()
        })
    }

    pub fn has_nickname(&self, nick: &str) -> bool {
        self.db.lock().unwrap().contains_key(nick)
    }

    pub fn nicknames(&self) -> Vec<String> {
        let mut v: Vec<String> = self.db.lock().unwrap().keys().cloned().collect();
        v.sort();
        v
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    fn openssl(&self, args: &[String]) -> ToolOutput {
        if self.openssl_broken {
            return fail("openssl: not available");
        }
        let Some(cert) = value_after(args, "-in") else {
            return fail("missing -in");
        };
        let cert = Path::new(cert);
        if args.iter().any(|a| a == "-hash") {
            if subject_line(cert).is_none() {
                return fail("unable to load certificate");
            }
            ok(format!("{}\n", fake_hash(cert)))
        } else if args.iter().any(|a| a == "-subject") {
            match subject_line(cert) {
                Some(line) => ok(format!("{line}\n")),
                None => fail("unable to load certificate"),
            }
        } else {
            fail("unsupported openssl call")
        }
    }

    fn certutil(&self, args: &[String]) -> ToolOutput {
        let Some(nick) = value_after(args, "-n") else {
            return fail("missing -n");
        };
        let mut db = self.db.lock().unwrap();
        if args.iter().any(|a| a == "-A") {
            if db.contains_key(nick) {
                return fail("certutil: nickname already in use");
            }
            let Some(cert) = value_after(args, "-i") else {
                return fail("missing -i");
            };
            match fs::read(cert) {
                Ok(bytes) => {
                    db.insert(nick.to_string(), bytes);
                    ok("")
                }
                Err(e) => fail(e.to_string()),
            }
        } else if args.iter().any(|a| a == "-D") {
            match db.remove(nick) {
                Some(_) => ok(""),
                None => fail("certutil: could not find certificate named"),
            }
        } else if args.iter().any(|a| a == "-L") {
            if db.contains_key(nick) {
                ok(format!("{nick}  C,C,C\n"))
            } else {
                fail("certutil: could not find certificate named")
            }
        } else {
            fail("unsupported certutil call")
        }
    }
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).map(String::as_str)
}

impl ToolRunner for FakeTools {
    fn run(&self, program: &Path, args: &[&OsStr]) -> Result<ToolOutput> {
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        let mut call = vec![program.display().to_string()];
        call.extend(args.iter().cloned());
        self.calls.lock().unwrap().push(call);

        match program.file_name().and_then(OsStr::to_str) {
            Some("openssl") => Ok(self.openssl(&args)),
            Some("certutil") => Ok(self.certutil(&args)),
            _ => Err(StoreError::tool(
                program.display().to_string(),
                "No such file or directory",
            )),
        }
    }
}

/// Write an executable fake `openssl` script that prints a fixed hash.
#[cfg(unix)]
pub fn fake_openssl_script(dir: &Path, hash: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let p = dir.join("openssl");
    fs::write(&p, format!("#!/bin/sh\necho {hash}\n")).unwrap();
    let mut perms = fs::metadata(&p).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&p, perms).unwrap();
    p
}
