//! Timestamp preservation for copied files.

use filetime::{FileTime, set_file_times};
use std::fs::Metadata;
use std::path::Path;

/// Apply the source's access and modification times to `dest`. Best-effort.
pub(crate) fn preserve_timestamps(src_meta: &Metadata, dest: &Path) {
    let mt = FileTime::from_last_modification_time(src_meta);
    let at = FileTime::from_last_access_time(src_meta);
    if let Err(e) = set_file_times(dest, at, mt) {
        tracing::debug!(dest = %dest.display(), error = %e, "could not preserve timestamps");
    }
}
