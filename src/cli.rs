//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug.
//! - Flags left unset keep the value from config.xml (or the built-in default).

use clap::{Parser, ValueHint};
use std::path::PathBuf;
use std::time::Duration;

use forensic_transfer::{HashAlgorithm, LogLevel, MoveBehavior, TransferConfig};

/// Move or copy evidence into a destination root with hash verification.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fxfer",
    author,
    version,
    about = "Move or copy files and folders with hash verification and rollback"
)]
pub struct Args {
    /// Files or directories to transfer; each lands under DEST by its own name.
    #[arg(value_name = "SOURCE", value_hint = ValueHint::AnyPath)]
    pub sources: Vec<PathBuf>,

    /// Destination root directory (created if missing).
    #[arg(long, short = 'o', value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub dest: Option<PathBuf>,

    /// Same-device behavior: auto_move, auto_copy or ask.
    #[arg(long, value_name = "BEHAVIOR")]
    pub behavior: Option<MoveBehavior>,

    /// Skip hashing; outcomes are not verified.
    #[arg(long)]
    pub no_hash: bool,

    /// Hash algorithm: sha256 or md5.
    #[arg(long, value_name = "ALG")]
    pub algorithm: Option<HashAlgorithm>,

    /// Path length that switches to extended-length handling.
    #[arg(long, value_name = "N")]
    pub long_path_threshold: Option<usize>,

    /// Never use the extended-length path prefix.
    #[arg(long)]
    pub no_extended_paths: bool,

    /// Keep completed files when a run fails instead of rolling back.
    #[arg(long)]
    pub keep_completed_on_failure: bool,

    /// Write a CSV hash manifest here after the run.
    #[arg(long, value_name = "CSV", value_hint = ValueHint::FilePath)]
    pub manifest: Option<PathBuf>,

    /// Write a JSON hash manifest here after the run.
    #[arg(long, value_name = "JSON", value_hint = ValueHint::FilePath)]
    pub manifest_json: Option<PathBuf>,

    /// Minimum gap between progress lines, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub progress_interval_ms: Option<u64>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(short = 'd', long, help = "Enable debug logging (shorthand for --log-level debug)")]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Also write logs to this file.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Print where fxfer looks for its config file, then exit.
    #[arg(long)]
    pub print_config: bool,

    /// Write a commented template config file, then exit.
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut TransferConfig) {
        if let Some(b) = self.behavior {
            cfg.same_drive_behavior = b;
        }
        if self.no_hash {
            cfg.calculate_hashes = false;
        }
        if let Some(a) = self.algorithm {
            cfg.hash_algorithm = a;
        }
        if let Some(n) = self.long_path_threshold {
            cfg.long_path_threshold = n;
        }
        if self.no_extended_paths {
            cfg.extended_paths = false;
        }
        if self.keep_completed_on_failure {
            cfg.preserve_completed_on_failure = true;
        }
        if let Some(ms) = self.progress_interval_ms {
            cfg.progress_interval = Duration::from_millis(ms);
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(p) = &self.log_file {
            cfg.log_file = Some(p.clone());
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_config() {
        let args = Args::parse_from([
            "fxfer",
            "--dest",
            "/out",
            "--behavior",
            "auto_copy",
            "--algorithm",
            "md5",
            "--no-hash",
            "--debug",
            "a",
            "b",
        ]);
        let mut cfg = TransferConfig::default();
        args.apply_overrides(&mut cfg);
        assert_eq!(cfg.same_drive_behavior, MoveBehavior::AlwaysCopy);
        assert_eq!(cfg.hash_algorithm, HashAlgorithm::Md5);
        assert!(!cfg.calculate_hashes);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(args.sources.len(), 2);
    }

    #[test]
    fn unset_flags_keep_config() {
        let args = Args::parse_from(["fxfer", "--dest", "/out", "x"]);
        let mut cfg = TransferConfig {
            preserve_completed_on_failure: true,
            ..TransferConfig::default()
        };
        args.apply_overrides(&mut cfg);
        assert!(cfg.preserve_completed_on_failure);
        assert!(cfg.calculate_hashes);
    }
}
