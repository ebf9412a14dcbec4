//! Buffered, hash-verified file copy.
//!
//! Features:
//! - Buffer size scales with file size (see `buffer_size_for`).
//! - Each chunk goes to the writer and the source hasher in the same pass.
//! - Writes land in a hidden temp sibling, are fsynced, then renamed into place
//!   without clobbering an existing destination.
//! - The destination is re-read from disk for its hash after the rename.
//! - A caller checkpoint runs after every chunk; an error from it aborts the copy
//!   and removes the partial temp file.
//!
//! Snapshot semantics: the source is read once from start to EOF; bytes appended
//! concurrently are not included and show up as a hash mismatch only if they
//! land before EOF.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use crate::errors::TransferError;
use crate::fs_ops::helpers::io_error_with_help;
use crate::fs_ops::meta::preserve_timestamps;
use crate::fs_ops::util::unique_temp_path;
use crate::platform;
use crate::transfer::hashing::{ContentHash, DestinationHasher, HashAlgorithm, StreamHasher};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;

/// Buffer size for a file of `file_size` bytes. Lower bounds are inclusive.
///
/// | size           | buffer                  |
/// |----------------|-------------------------|
/// | < 1 MiB        | min(size, 64 KiB)       |
/// | 1 MiB..10 MiB  | 256 KiB                 |
/// | 10 MiB..100 MiB| 1 MiB                   |
/// | >= 100 MiB     | min(10 MiB, size / 100) |
pub fn buffer_size_for(file_size: u64) -> usize {
    let size = if file_size < MIB {
        file_size.min(64 * KIB)
    } else if file_size < 10 * MIB {
        256 * KIB
    } else if file_size < 100 * MIB {
        MIB
    } else {
        (file_size / 100).min(10 * MIB)
    };
    size.max(1) as usize
}

/// Chunk notifications passed to the copy callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyProgress {
    /// Bytes written to the destination.
    Written(usize),
    /// Bytes re-read from the destination for its hash.
    Verified(usize),
}

/// Result of a copy.
#[derive(Debug, Clone)]
pub struct CopyResult {
    /// Bytes actually written to the destination.
    pub bytes: u64,
    pub buf_size: usize,
    /// Hash of the bytes read from the source during the copy.
    pub source_hash: Option<ContentHash>,
    /// Hash from re-reading the destination after it was synced.
    pub dest_hash: Option<ContentHash>,
}

impl CopyResult {
    /// True when hashing was off, or both hashes agree.
    pub fn hashes_match(&self) -> bool {
        match (&self.source_hash, &self.dest_hash) {
            (Some(s), Some(d)) => s == d,
            _ => true,
        }
    }
}

/// Copy `src` to `dst` (which must not exist; its parent must).
///
/// `verifier` re-reads the destination for its hash. `on_chunk` runs after
/// every chunk written and every chunk re-read.
pub fn copy_with_hash<F>(
    src: &Path,
    dst: &Path,
    algorithm: Option<HashAlgorithm>,
    verifier: &dyn DestinationHasher,
    preserve_times: bool,
    mut on_chunk: F,
) -> Result<CopyResult, TransferError>
where
    F: FnMut(CopyProgress) -> Result<(), TransferError>,
{
    if fs::symlink_metadata(dst).is_ok() {
        return Err(TransferError::DestinationExists(dst.to_path_buf()));
    }
    let parent = dst.parent().unwrap_or_else(|| Path::new("."));

    let mut src_f = File::open(src).map_err(io_error_with_help("open source", src))?;
    let src_meta = src_f
        .metadata()
        .map_err(io_error_with_help("stat source", src))?;
    let buf_size = buffer_size_for(src_meta.len());

    let tmp = unique_temp_path(parent);
    let mut opts = OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        const FILE_FLAG_WRITE_THROUGH: u32 = 0x8000_0000;
        opts.custom_flags(FILE_FLAG_WRITE_THROUGH);
    }
    let mut dst_f = opts
        .open(&tmp)
        .map_err(io_error_with_help("create temp file", &tmp))?;

    let written = (|| -> Result<(u64, Option<ContentHash>), TransferError> {
        let mut buf = vec![0u8; buf_size];
        let mut hasher = algorithm.map(StreamHasher::new);
        let mut total: u64 = 0;
        loop {
            let n = src_f
                .read(&mut buf)
                .map_err(io_error_with_help("read source", src))?;
            if n == 0 {
                break;
            }
            dst_f
                .write_all(&buf[..n])
                .map_err(io_error_with_help("write destination", dst))?;
            if let Some(h) = hasher.as_mut() {
                h.update(&buf[..n]);
            }
            total += n as u64;
            on_chunk(CopyProgress::Written(n))?;
        }
        dst_f
            .flush()
            .map_err(io_error_with_help("flush destination", dst))?;
        dst_f
            .sync_all()
            .map_err(io_error_with_help("fsync destination", dst))?;
        Ok((total, hasher.map(StreamHasher::finalize)))
    })();
    drop(dst_f);

    let (bytes, source_hash) = match written {
        Ok(v) => v,
        Err(e) => {
            if let Err(rm) = fs::remove_file(&tmp) {
                tracing::warn!(
                    temp = %tmp.display(),
                    error = %rm,
                    "failed to remove partial temp file"
                );
            }
            return Err(e);
        }
    };

    if preserve_times {
        preserve_timestamps(&src_meta, &tmp);
    }

    if let Err(e) = platform::rename_strict(&tmp, dst) {
        let _ = fs::remove_file(&tmp);
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            return Err(TransferError::DestinationExists(dst.to_path_buf()));
        }
        return Err(io_error_with_help("rename temp into place", dst)(e));
    }
    let _ = platform::fsync_dir(parent);

    // The caller only learns about `dst` on success, so an aborted verify removes it.
    let dest_hash = match algorithm {
        Some(alg) => match verifier.hash_destination(dst, alg, &mut |n| {
            on_chunk(CopyProgress::Verified(n))
        }) {
            Ok(h) => Some(h),
            Err(e) => {
                let _ = fs::remove_file(dst);
                return Err(e);
            }
        },
        None => None,
    };

    Ok(CopyResult {
        bytes,
        buf_size,
        source_hash,
        dest_hash,
    })
}
