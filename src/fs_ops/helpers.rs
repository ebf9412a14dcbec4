//! I/O error helpers.
//!
//! Enriches `io::Error` with operation, path and platform-aware hints, and
//! classifies raw OS codes into the typed `TransferError` variants.
//!
//! Usage:
//!   // in functions returning Result<_, TransferError>
//!   fs::create_dir(dir).map_err(io_error_with_help("create dir", dir))?;
//!
//!   // in functions returning anyhow::Result<_>
//!   fs::read(p).map_err(io_error_with_help_anyhow("read config", p))?;

use anyhow::anyhow;
use std::io;
use std::path::Path;

use crate::errors::TransferError;

/// Format a human-friendly message with op/path plus platform-aware hints.
pub(crate) fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);

    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            match code {
                libc::EACCES | libc::EPERM => {
                    msg.push_str(" (permission denied; check ownership and write permissions)");
                }
                libc::EXDEV => {
                    msg.push_str(" (cross-filesystem; a native rename is not possible)");
                }
                libc::EBUSY => {
                    msg.push_str(" (resource busy; ensure no other process holds it)");
                }
                libc::ENOENT => {
                    msg.push_str(" (path not found; verify it exists)");
                }
                libc::EEXIST | libc::ENOTEMPTY => {
                    msg.push_str(" (already exists; remove the target or pick another root)");
                }
                libc::ENOSPC => {
                    msg.push_str(" (insufficient space on device)");
                }
                libc::EROFS => {
                    msg.push_str(" (read-only filesystem; cannot write here)");
                }
                libc::ENAMETOOLONG => {
                    msg.push_str(" (filename or path too long; shorten path segments)");
                }
                libc::EMFILE | libc::ENFILE => {
                    msg.push_str(" (file descriptor limit reached; close files or raise limits)");
                }
                _ => {}
            }
        }
        #[cfg(windows)]
        {
            match code {
                // ERROR_ACCESS_DENIED
                5 => msg.push_str(" (access denied; check permissions)"),
                // ERROR_NOT_SAME_DEVICE
                17 => msg.push_str(" (not same device; cross-volume move)"),
                // ERROR_SHARING_VIOLATION
                32 => msg.push_str(" (sharing violation; file is in use)"),
                2 | 3 => msg.push_str(" (path not found; verify it exists)"),
                80 | 183 => msg.push_str(" (already exists; remove the target)"),
                // ERROR_HANDLE_DISK_FULL, ERROR_DISK_FULL
                39 | 112 => msg.push_str(" (insufficient disk space)"),
                19 => msg.push_str(" (write protected media)"),
                206 => msg.push_str(" (filename or path too long; MAX_PATH exceeded)"),
                _ => {}
            }
        }
        msg.push_str(&format!(" [os code: {}]", code));
    } else {
        match e.kind() {
            io::ErrorKind::PermissionDenied => {
                msg.push_str(" (permission denied; check ownership and write permissions)");
            }
            io::ErrorKind::NotFound => msg.push_str(" (path not found; verify it exists)"),
            io::ErrorKind::AlreadyExists => msg.push_str(" (already exists; remove the target)"),
            _ => {}
        }
    }

    msg
}

pub(crate) fn is_disk_full(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::StorageFull {
        return true;
    }
    match e.raw_os_error() {
        #[cfg(unix)]
        Some(code) => code == libc::ENOSPC || code == libc::EDQUOT,
        #[cfg(windows)]
        Some(code) => code == 39 || code == 112,
        _ => false,
    }
}

pub(crate) fn is_name_too_long(e: &io::Error) -> bool {
    match e.raw_os_error() {
        #[cfg(unix)]
        Some(code) => code == libc::ENAMETOOLONG,
        #[cfg(windows)]
        Some(code) => code == 206,
        _ => false,
    }
}

pub(crate) fn is_cross_device(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::CrossesDevices {
        return true;
    }
    match e.raw_os_error() {
        #[cfg(unix)]
        Some(code) => code == libc::EXDEV,
        #[cfg(windows)]
        Some(code) => code == 17,
        _ => false,
    }
}

/// Map an `io::Error` from `op` on `path` to the closest typed variant.
pub(crate) fn classify_io(op: &str, path: &Path, e: io::Error) -> TransferError {
    let context = build_message(op, path, &e);
    if is_disk_full(&e) {
        return TransferError::DiskFull {
            path: path.to_path_buf(),
            context,
        };
    }
    if is_name_too_long(&e) {
        return TransferError::PathTooLong {
            path: path.to_path_buf(),
            len: path.as_os_str().len(),
        };
    }
    match e.kind() {
        io::ErrorKind::PermissionDenied => TransferError::PermissionDenied {
            path: path.to_path_buf(),
            context,
            source: e,
        },
        _ => TransferError::Io {
            path: path.to_path_buf(),
            context,
            source: e,
        },
    }
}

/// Closure adapter for `.map_err(...)` in `Result<_, TransferError>` code.
pub(crate) fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> TransferError + 'a {
    move |e: io::Error| classify_io(op, path, e)
}

/// Closure adapter for anyhow::Result code (config and CLI layers).
pub fn io_error_with_help_anyhow<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(build_message(op, path, &e))
}
