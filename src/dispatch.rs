//! Apply one operation to every certificate across the selected stores.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::store::CertStore;

/// The operation requested for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
    Check,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Add => "add",
            Operation::Remove => "remove",
            Operation::Check => "check",
        })
    }
}

/// Counts from one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub attempted: usize,
    pub failed: usize,
}

impl Summary {
    pub fn ok(&self) -> bool {
        self.failed == 0
    }
}

/// Run `op` for each certificate against each store, in order.
///
/// A failing pair is written to `out` and never stops the rest. `check`
/// writes one line per pair; `add` and `remove` only write failures.
pub fn dispatch<S, W>(op: Operation, certs: &[PathBuf], stores: &[S], out: &mut W) -> io::Result<Summary>
where
    S: CertStore,
    W: Write,
{
    let mut summary = Summary::default();
    for cert in certs {
        for store in stores {
            summary.attempted += 1;
            let result = match op {
                Operation::Add => store.add(cert).map(|()| None),
                Operation::Remove => store.remove(cert).map(|()| None),
                Operation::Check => store.check(cert).map(Some),
            };
            match result {
                Ok(None) => {}
                Ok(Some(present)) => {
                    let state = if present { "present" } else { "absent" };
                    writeln!(out, "{}: {}: {state}", store.name(), cert.display())?;
                }
                Err(e) => {
                    summary.failed += 1;
                    debug!(store = store.name(), cert = %cert.display(), %op, error = %e, "operation failed");
                    writeln!(out, "{}: {}: {op} failed: {e}", store.name(), cert.display())?;
                }
            }
        }
    }
    Ok(summary)
}
