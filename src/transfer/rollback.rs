//! Rollback ledger.
//!
//! Every completed filesystem mutation of a run is recorded in order. Undo
//! walks the ledger backwards: moves are renamed back, copies deleted, and
//! directories we created removed once empty. Individual undo failures are
//! collected; undo never stops early.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::fs_ops::long_path::LongPathPolicy;
use crate::fs_ops::native_move::{NativeMover, move_native};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackAction {
    Moved,
    Copied,
    CreatedDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LedgerEntry {
    action: RollbackAction,
    original: PathBuf,
    current: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct RollbackFailure {
    pub action: RollbackAction,
    pub original: PathBuf,
    pub current: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RollbackReport {
    /// Items put back in their pre-run state: moves renamed back, copies deleted.
    pub restored: Vec<PathBuf>,
    /// Directories the run created and removed again.
    pub dirs_removed: Vec<PathBuf>,
    pub failed: Vec<RollbackFailure>,
    /// Completed work was deliberately kept.
    pub preserved: bool,
}

impl RollbackReport {
    pub fn preserved() -> Self {
        Self {
            preserved: true,
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.preserved && self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RollbackCoordinator {
    ledger: Vec<LedgerEntry>,
}

impl RollbackCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_move(&mut self, original: &Path, current: &Path) {
        self.push(RollbackAction::Moved, original, current);
    }

    pub fn record_copy(&mut self, source: &Path, copy: &Path) {
        self.push(RollbackAction::Copied, source, copy);
    }

    pub fn record_created_dir(&mut self, dir: &Path) {
        self.push(RollbackAction::CreatedDir, dir, dir);
    }

    fn push(&mut self, action: RollbackAction, original: &Path, current: &Path) {
        self.ledger.push(LedgerEntry {
            action,
            original: original.to_path_buf(),
            current: current.to_path_buf(),
        });
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    /// Forget everything; the run committed.
    pub fn commit(&mut self) {
        self.ledger.clear();
    }

    /// Undo all recorded mutations in reverse order.
    pub fn rollback_all(
        &mut self,
        mover: &dyn NativeMover,
        policy: &LongPathPolicy,
    ) -> RollbackReport {
        let mut report = RollbackReport::default();
        info!(entries = self.ledger.len(), "rolling back transfer");
        while let Some(entry) = self.ledger.pop() {
            match undo(&entry, mover, policy) {
                Ok(true) if entry.action == RollbackAction::CreatedDir => {
                    report.dirs_removed.push(entry.original)
                }
                Ok(true) => report.restored.push(entry.original),
                Ok(false) => {}
                Err(error) => {
                    warn!(
                        action = ?entry.action,
                        original = %entry.original.display(),
                        current = %entry.current.display(),
                        %error,
                        "rollback step failed"
                    );
                    report.failed.push(RollbackFailure {
                        action: entry.action,
                        original: entry.original,
                        current: entry.current,
                        error,
                    });
                }
            }
        }
        info!(
            restored = report.restored.len(),
            dirs_removed = report.dirs_removed.len(),
            failed = report.failed.len(),
            "rollback finished"
        );
        report
    }
}

/// Ok(true) when something was restored, Ok(false) when there was nothing to do.
fn undo(
    entry: &LedgerEntry,
    mover: &dyn NativeMover,
    policy: &LongPathPolicy,
) -> Result<bool, String> {
    match entry.action {
        RollbackAction::Moved => move_native(mover, &entry.current, &entry.original, policy)
            .map(|_| true)
            .map_err(|e| e.to_string()),
        RollbackAction::Copied => match fs::remove_file(&entry.current) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(format!("remove copy '{}': {}", entry.current.display(), e)),
        },
        RollbackAction::CreatedDir => match fs::remove_dir(&entry.current) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => {
                debug!(
                    dir = %entry.current.display(),
                    "created directory holds foreign files; left in place"
                );
                Ok(false)
            }
            Err(e) => Err(format!("remove dir '{}': {}", entry.current.display(), e)),
        },
    }
}
