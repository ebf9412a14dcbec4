//! Post-transfer verification.
//!
//! An intact directory move produces no per-file records while it happens, so
//! the moved tree is walked afterwards to emit one outcome per file, hashed
//! from the destination when hashing is on. The final file-count check
//! compares recorded outcomes against what is actually on disk.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::TransferError;
use crate::fs_ops::helpers::classify_io;
use crate::transfer::hashing::{DestinationHasher, HashAlgorithm};
use crate::transfer::item::TransferOperation;
use crate::transfer::outcome::TransferOutcome;

/// A regular file found under a destination directory.
#[derive(Debug, Clone)]
pub struct DestinationFile {
    pub path: PathBuf,
    /// Relative to the walked directory.
    pub relative: PathBuf,
    pub size: u64,
}

/// Regular files below `dir`, sorted by name. Nothing is filtered by name: a
/// moved tree is reported exactly as it sits on disk.
pub fn enumerate_files(dir: &Path) -> Result<Vec<DestinationFile>, TransferError> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            match e.into_io_error() {
                Some(io) => classify_io("walk destination", &path, io),
                None => TransferError::InvalidItem {
                    path,
                    reason: "filesystem loop in destination".into(),
                },
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let size = entry
            .metadata()
            .map_err(|e| TransferError::InvalidItem {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?
            .len();
        out.push(DestinationFile {
            path: entry.path().to_path_buf(),
            relative: entry
                .path()
                .strip_prefix(dir)
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            size,
        });
    }
    Ok(out)
}

/// Build move outcomes for a directory renamed from `source_dir` to `dest_dir`.
///
/// `on_file` runs before each file and `on_chunk` between hash chunks; both may
/// abort with `Cancelled`.
pub fn verify_moved_tree<F, C>(
    files: &[DestinationFile],
    source_dir: &Path,
    relative_base: &Path,
    algorithm: Option<HashAlgorithm>,
    hasher: &dyn DestinationHasher,
    mut on_file: F,
    mut on_chunk: C,
) -> Result<Vec<TransferOutcome>, TransferError>
where
    F: FnMut(&DestinationFile) -> Result<(), TransferError>,
    C: FnMut(usize) -> Result<(), TransferError>,
{
    let mut outcomes = Vec::with_capacity(files.len());
    for file in files {
        on_file(file)?;
        let content_hash = match algorithm {
            Some(alg) => Some(hasher.hash_destination(&file.path, alg, &mut on_chunk)?),
            None => None,
        };
        outcomes.push(TransferOutcome {
            relative_path: relative_base.join(&file.relative),
            source_path: source_dir.join(&file.relative),
            destination_path: file.path.clone(),
            byte_size: file.size,
            operation: TransferOperation::Move,
            verified: content_hash.is_some(),
            content_hash,
            source_hash: None,
            error: None,
        });
    }
    Ok(outcomes)
}

pub fn validate_file_count(expected: usize, actual: usize) -> Result<(), TransferError> {
    if expected != actual {
        return Err(TransferError::FileCountMismatch { expected, actual });
    }
    Ok(())
}
