//! Native same-device move with escalating strictness.
//!
//! Stage 1 renames without permission to replace or copy. Only when the OS
//! refuses that for access/capability reasons does stage 2 retry with the
//! permissive primitive. A refused stage 2 is fatal and carries both OS codes;
//! there is never a fallback to copying.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::errors::TransferError;
use crate::fs_ops::helpers::{build_message, is_cross_device, is_name_too_long};
use crate::fs_ops::long_path::{LongPathPolicy, path_len};
use crate::platform;

/// OS rename primitives, swappable for tests.
pub trait NativeMover: Send + Sync {
    fn rename_strict(&self, src: &Path, dst: &Path) -> io::Result<()>;
    fn rename_permissive(&self, src: &Path, dst: &Path) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformMover;

impl NativeMover for PlatformMover {
    fn rename_strict(&self, src: &Path, dst: &Path) -> io::Result<()> {
        platform::rename_strict(src, dst)
    }

    fn rename_permissive(&self, src: &Path, dst: &Path) -> io::Result<()> {
        platform::rename_permissive(src, dst)
    }
}

/// Which attempt succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStage {
    Strict,
    Permissive,
}

/// Move `src` to `dst` (which must not exist) on the same device.
pub fn move_native(
    mover: &dyn NativeMover,
    src: &Path,
    dst: &Path,
    policy: &LongPathPolicy,
) -> Result<MoveStage, TransferError> {
    if fs::symlink_metadata(dst).is_ok() {
        return Err(TransferError::DestinationExists(dst.to_path_buf()));
    }
    if let Err(e) = fs::symlink_metadata(src)
        && e.kind() == io::ErrorKind::NotFound
    {
        return Err(TransferError::SourceNotFound(src.to_path_buf()));
    }

    let prepared = policy.prepare(src, dst)?;

    let stage = match mover.rename_strict(&prepared.src, &prepared.dst) {
        Ok(()) => MoveStage::Strict,
        Err(strict) if platform::should_escalate(&strict) => {
            warn!(
                src = %src.display(),
                dest = %dst.display(),
                error = %strict,
                "strict rename refused; retrying with permissive rename"
            );
            match mover.rename_permissive(&prepared.src, &prepared.dst) {
                Ok(()) => MoveStage::Permissive,
                Err(permissive) => {
                    return Err(TransferError::NativeMoveFailed {
                        src: src.to_path_buf(),
                        dest: dst.to_path_buf(),
                        strict: build_message("strict rename", src, &strict),
                        permissive: build_message("permissive rename", src, &permissive),
                        strict_code: strict.raw_os_error(),
                        permissive_code: permissive.raw_os_error(),
                    });
                }
            }
        }
        Err(strict) => return Err(classify_strict_failure(src, dst, strict)),
    };

    if let Some(parent) = dst.parent() {
        let _ = platform::fsync_dir(parent);
    }
    debug!(src = %src.display(), dest = %dst.display(), ?stage, "native move complete");
    Ok(stage)
}

fn classify_strict_failure(src: &Path, dst: &Path, e: io::Error) -> TransferError {
    if is_cross_device(&e) {
        return TransferError::DeviceMismatch {
            src: src.to_path_buf(),
            dest: dst.to_path_buf(),
        };
    }
    if is_name_too_long(&e) {
        let longest = if path_len(src) >= path_len(dst) { src } else { dst };
        return TransferError::PathTooLong {
            path: longest.to_path_buf(),
            len: path_len(longest),
        };
    }
    if e.kind() == io::ErrorKind::AlreadyExists || e.kind() == io::ErrorKind::DirectoryNotEmpty {
        return TransferError::DestinationExists(dst.to_path_buf());
    }
    if e.kind() == io::ErrorKind::NotFound {
        return TransferError::SourceNotFound(src.to_path_buf());
    }
    TransferError::NativeMoveFailed {
        src: src.to_path_buf(),
        dest: dst.to_path_buf(),
        strict: build_message("strict rename", src, &e),
        permissive: "not attempted".to_string(),
        strict_code: e.raw_os_error(),
        permissive_code: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn moves_directory_with_contents() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("case");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("a.bin"), b"a").unwrap();
        let dst = dir.path().join("out");

        let stage = move_native(&PlatformMover, &src, &dst, &LongPathPolicy::default()).unwrap();
        assert_eq!(stage, MoveStage::Strict);
        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("a.bin")).unwrap(), b"a");
    }

    #[test]
    fn existing_destination_is_refused_before_touching_os() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        fs::write(&src, b"a").unwrap();
        fs::create_dir(&dst).unwrap();
        let err = move_native(&PlatformMover, &src, &dst, &LongPathPolicy::default()).unwrap_err();
        assert!(matches!(err, TransferError::DestinationExists(_)));
        assert!(src.exists());
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempdir().unwrap();
        let err = move_native(
            &PlatformMover,
            &dir.path().join("nope"),
            &dir.path().join("dst"),
            &LongPathPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TransferError::SourceNotFound(_)));
    }
}
