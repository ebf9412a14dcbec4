//! Core configuration types.
//! - TransferConfig holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::fs_ops::long_path::{DEFAULT_LONG_PATH_THRESHOLD, LongPathPolicy};
use crate::transfer::engine::{FailurePolicy, TransferOptions};
use crate::transfer::hashing::HashAlgorithm;
use crate::transfer::item::MoveBehavior;

pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 100;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration for a transfer run.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferConfig {
    /// What to do with items that share a device with the destination
    pub same_drive_behavior: MoveBehavior,
    pub calculate_hashes: bool,
    pub hash_algorithm: HashAlgorithm,
    /// Absolute path length (chars) beyond which extended-length handling kicks in
    pub long_path_threshold: usize,
    /// Use the `\\?\` prefix where the platform supports it
    pub extended_paths: bool,
    /// Keep completed work when a run fails instead of rolling back
    pub preserve_completed_on_failure: bool,
    pub preserve_timestamps: bool,
    pub progress_interval: Duration,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            same_drive_behavior: MoveBehavior::AlwaysMoveIfPossible,
            calculate_hashes: true,
            hash_algorithm: HashAlgorithm::Sha256,
            long_path_threshold: DEFAULT_LONG_PATH_THRESHOLD,
            extended_paths: true,
            preserve_completed_on_failure: false,
            preserve_timestamps: true,
            progress_interval: Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
            log_level: LogLevel::Normal,
            log_file: None,
        }
    }
}

impl TransferConfig {
    /// Engine options derived from this config.
    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            behavior: self.same_drive_behavior,
            hash_algorithm: self.calculate_hashes.then_some(self.hash_algorithm),
            long_paths: LongPathPolicy::for_platform(self.long_path_threshold, self.extended_paths),
            failure_policy: if self.preserve_completed_on_failure {
                FailurePolicy::PreserveCompleted
            } else {
                FailurePolicy::RollbackAll
            },
            preserve_timestamps: self.preserve_timestamps,
            check_free_space: true,
            progress_interval: self.progress_interval,
        }
    }
}
