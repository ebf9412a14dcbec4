use std::path::Path;

use crate::errors::TransferError;
use crate::fs_ops::helpers::io_error_with_help;
use crate::platform::free_space_bytes;

/// Headroom kept free on the destination beyond the bytes we will write.
pub const SPACE_CUSHION: u64 = 4 * 1024 * 1024;

pub fn format_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.1} GiB", f / GB)
    } else if f >= MB {
        format!("{:.1} MiB", f / MB)
    } else if f >= KB {
        format!("{:.1} KiB", f / KB)
    } else {
        format!("{} B", n)
    }
}

/// Fail with `DiskFull` when `dst_dir` cannot hold `required` bytes plus the cushion.
pub(crate) fn ensure_space_for_copy(dst_dir: &Path, required: u64) -> Result<(), TransferError> {
    if required == 0 {
        return Ok(());
    }
    let free = free_space_bytes(dst_dir).map_err(io_error_with_help("query free space", dst_dir))?;
    if free < required.saturating_add(SPACE_CUSHION) {
        return Err(TransferError::DiskFull {
            path: dst_dir.to_path_buf(),
            context: format!(
                "need ~{} for copies, {} free",
                format_bytes(required),
                format_bytes(free)
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn formats_binary_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.0 MiB");
    }

    #[test]
    fn absurd_requirement_is_disk_full() {
        let dir = tempdir().unwrap();
        let err = ensure_space_for_copy(dir.path(), u64::MAX - 1).unwrap_err();
        assert!(matches!(err, TransferError::DiskFull { .. }));
    }

    #[test]
    fn small_requirement_passes() {
        let dir = tempdir().unwrap();
        ensure_space_for_copy(dir.path(), 1024).unwrap();
    }
}
