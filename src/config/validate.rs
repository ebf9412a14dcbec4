//! Config validation logic.
//! Range checks on tunables and a usability check on the destination root.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

use super::types::TransferConfig;
use crate::fs_ops::long_path::EXTENDED_PATH_LIMIT;

pub const MAX_PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

impl TransferConfig {
    /// Validate tunables that the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if !(1..=EXTENDED_PATH_LIMIT).contains(&self.long_path_threshold) {
            bail!(
                "long_path_threshold must be between 1 and {EXTENDED_PATH_LIMIT}, got {}",
                self.long_path_threshold
            );
        }
        if self.progress_interval > MAX_PROGRESS_INTERVAL {
            bail!(
                "progress_interval_ms must be at most {}, got {}",
                MAX_PROGRESS_INTERVAL.as_millis(),
                self.progress_interval.as_millis()
            );
        }
        if let Some(log) = &self.log_file
            && log.is_dir()
        {
            bail!("log_file '{}' is a directory", log.display());
        }
        debug!(
            behavior = %self.same_drive_behavior,
            hashes = self.calculate_hashes,
            algorithm = %self.hash_algorithm,
            threshold = self.long_path_threshold,
            "config validated"
        );
        Ok(())
    }
}

/// Ensure the destination root is a writable directory, creating it if missing.
pub fn ensure_destination_root(path: &Path) -> Result<()> {
    ensure_dir_is_or_create(path, "destination")?;
    ensure_writable(path, "destination")
}

/// Ensure directory exists (create if missing). If exists, it must be a directory.
fn ensure_dir_is_or_create(path: &Path, name: &str) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            error!("{name} exists but isn't a directory: {}", path.display());
            bail!("{name} exists but isn't a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create {name} directory '{}'", path.display()))?;
        info!("Created {name} directory: {}", path.display());
    }
    Ok(())
}

/// Ensure directory is writable using a throwaway marker file.
fn ensure_writable(path: &Path, name: &str) -> Result<()> {
    let marker = path.join(format!(".fxfer.marker.{}", std::process::id()));
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&marker)
        .with_context(|| {
            format!("Cannot write to {name} '{}'; check permissions", path.display())
        })?;
    let _ = fs::remove_file(&marker);
    debug!("{name} writable: {}", path.display());
    Ok(())
}
