//! Unix implementations of platform helpers.

use anyhow::{Context, Result};
use std::ffi::CString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// Nominal path limit without any extended-length handling.
pub const NOMINAL_PATH_LIMIT: usize = libc::PATH_MAX as usize;

/// Unix has no extended-length prefix; long paths are bounded by PATH_MAX.
pub const SUPPORTS_EXTENDED_PREFIX: bool = false;

fn c_path(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))
}

/// Filesystem device id of an existing path.
pub fn device_id(path: &Path) -> io::Result<u64> {
    Ok(fs::metadata(path)?.dev())
}

/// Rename that refuses to replace an existing destination.
#[cfg(target_os = "linux")]
pub fn rename_strict(src: &Path, dst: &Path) -> io::Result<()> {
    let src_c = c_path(src)?;
    let dst_c = c_path(dst)?;
    let rc = unsafe {
        libc::syscall(
            libc::SYS_renameat2,
            libc::AT_FDCWD,
            src_c.as_ptr(),
            libc::AT_FDCWD,
            dst_c.as_ptr(),
            libc::RENAME_NOREPLACE as libc::c_uint,
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Rename that refuses to replace an existing destination.
#[cfg(not(target_os = "linux"))]
pub fn rename_strict(src: &Path, dst: &Path) -> io::Result<()> {
    if fs::symlink_metadata(dst).is_ok() {
        return Err(io::Error::from_raw_os_error(libc::EEXIST));
    }
    let src_c = c_path(src)?;
    let dst_c = c_path(dst)?;
    let rc = unsafe { libc::rename(src_c.as_ptr(), dst_c.as_ptr()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Plain rename(2); only reached after the strict attempt was refused.
pub fn rename_permissive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::rename(src, dst)
}

/// Errors from the strict rename that justify a permissive retry.
/// EINVAL/ENOSYS/ENOTSUP come back from filesystems without RENAME_NOREPLACE.
pub fn should_escalate(e: &io::Error) -> bool {
    match e.raw_os_error() {
        Some(code) => matches!(
            code,
            libc::EACCES | libc::EPERM | libc::EINVAL | libc::ENOSYS | libc::EOPNOTSUPP
        ),
        None => e.kind() == io::ErrorKind::PermissionDenied,
    }
}

/// Bytes available to unprivileged users at `path`.
pub fn free_space_bytes(path: &Path) -> io::Result<u64> {
    let mut s: libc::statvfs = unsafe { std::mem::zeroed() };
    let cpath = c_path(path)?;
    let rc = unsafe { libc::statvfs(cpath.as_ptr(), &mut s) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    #[allow(clippy::unnecessary_cast)]
    Ok((s.f_bavail as u64).saturating_mul(s.f_frsize as u64))
}

pub fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

/// Open log file for appending; set 0600 only when creating a new file.
/// Existing files keep their permissions.
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let existed = path.exists();
    let f = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(path)?;
    if !existed {
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(f)
}

fn config_tmp_sibling(target: &Path) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let name = format!(".fxfer.config.tmp.{}.{}", std::process::id(), nanos);
    target.parent().unwrap_or_else(|| Path::new(".")).join(name)
}

/// Write config atomically: temp file (0600) + fsync + rename + fsync dir.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "config path has no parent"))?;
    fs::create_dir_all(parent).with_context(|| format!("create parent '{}'", parent.display()))?;

    let tmp = config_tmp_sibling(path);
    let mut f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(&tmp)
        .with_context(|| format!("create temp '{}'", tmp.display()))?;
    f.write_all(contents).context("write temp")?;
    f.sync_all().context("fsync temp")?;
    drop(f);

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e)
            .with_context(|| format!("rename '{}' -> '{}'", tmp.display(), path.display()));
    }
    fsync_dir(parent).context("fsync parent dir")?;
    Ok(())
}

/// POSIX chmod 0700 for directories.
pub fn set_dir_mode_0700(path: &Path) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}
