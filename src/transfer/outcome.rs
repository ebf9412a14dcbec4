//! Per-file outcomes and the overall run result.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{ErrorKind, TransferError};
use crate::transfer::hashing::ContentHash;
use crate::transfer::item::TransferOperation;
use crate::transfer::metrics::TransferMetrics;
use crate::transfer::rollback::RollbackReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub relative_path: PathBuf,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub byte_size: u64,
    pub operation: TransferOperation,
    /// Hash of the destination as read back from disk.
    pub content_hash: Option<ContentHash>,
    /// Hash of the source bytes as they were read during a copy.
    pub source_hash: Option<ContentHash>,
    /// Content hash computed and, for copies, equal to the source hash.
    pub verified: bool,
    pub error: Option<ErrorKind>,
}

/// Outcomes keyed by path relative to the destination root, in completion order.
pub type OutcomeMap = IndexMap<PathBuf, TransferOutcome>;

pub(crate) fn insert_unique(
    map: &mut OutcomeMap,
    outcome: TransferOutcome,
) -> Result<(), TransferError> {
    if map.contains_key(&outcome.relative_path) {
        return Err(TransferError::DuplicateDestination(outcome.destination_path.clone()));
    }
    map.insert(outcome.relative_path.clone(), outcome);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    /// Everything landed but at least one file failed hash verification.
    PartialIntegrityFailure,
    Cancelled,
    /// Fatal error; rollback restored the original state.
    Failure,
    /// Fatal error and some completed work remains (preserved or undo failed).
    PartialFailure,
}

impl RunStatus {
    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Failure => 1,
            RunStatus::PartialIntegrityFailure => 2,
            RunStatus::PartialFailure => 3,
            RunStatus::Cancelled => 130,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Success => "success",
            RunStatus::PartialIntegrityFailure => "partial integrity failure",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failure => "failure",
            RunStatus::PartialFailure => "partial failure",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub enum TransferResult {
    Success {
        outcomes: OutcomeMap,
        metrics: TransferMetrics,
    },
    Failure {
        error: TransferError,
        partial_outcomes: OutcomeMap,
        rollback: RollbackReport,
        metrics: TransferMetrics,
    },
    Cancelled {
        partial_outcomes: OutcomeMap,
        rollback: RollbackReport,
        metrics: TransferMetrics,
    },
}

impl TransferResult {
    pub fn status(&self) -> RunStatus {
        match self {
            TransferResult::Success { outcomes, .. } => {
                if outcomes.values().any(|o| o.error == Some(ErrorKind::HashMismatch)) {
                    RunStatus::PartialIntegrityFailure
                } else {
                    RunStatus::Success
                }
            }
            TransferResult::Cancelled { .. } => RunStatus::Cancelled,
            TransferResult::Failure {
                partial_outcomes,
                rollback,
                ..
            } => {
                let kept_work = rollback.preserved && !partial_outcomes.is_empty();
                if kept_work || !rollback.failed.is_empty() {
                    RunStatus::PartialFailure
                } else {
                    RunStatus::Failure
                }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferResult::Success { .. })
    }

    pub fn outcomes(&self) -> &OutcomeMap {
        match self {
            TransferResult::Success { outcomes, .. } => outcomes,
            TransferResult::Failure {
                partial_outcomes, ..
            }
            | TransferResult::Cancelled {
                partial_outcomes, ..
            } => partial_outcomes,
        }
    }

    /// Outcome for a path relative to the destination root.
    pub fn outcome(&self, relative_path: impl AsRef<Path>) -> Option<&TransferOutcome> {
        self.outcomes().get(relative_path.as_ref())
    }

    pub fn metrics(&self) -> &TransferMetrics {
        match self {
            TransferResult::Success { metrics, .. }
            | TransferResult::Failure { metrics, .. }
            | TransferResult::Cancelled { metrics, .. } => metrics,
        }
    }

    pub fn rollback(&self) -> Option<&RollbackReport> {
        match self {
            TransferResult::Success { .. } => None,
            TransferResult::Failure { rollback, .. }
            | TransferResult::Cancelled { rollback, .. } => Some(rollback),
        }
    }

    pub fn error(&self) -> Option<&TransferError> {
        match self {
            TransferResult::Failure { error, .. } => Some(error),
            _ => None,
        }
    }
}
