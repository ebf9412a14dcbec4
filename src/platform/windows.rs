//! Windows implementations of platform helpers.
//!
//! Notes:
//! - Windows lacks POSIX mode semantics; we do not attempt ACL management here.
//! - Device identity is the volume serial number of the path's volume root.
//! - Renames go through MoveFileExW so the flags decide whether a copy is allowed.

use anyhow::{Result, bail};
use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::iter::once;
use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use windows_sys::Win32::Storage::FileSystem::{
    GetDiskFreeSpaceExW, GetVolumeInformationW, GetVolumePathNameW, MOVEFILE_COPY_ALLOWED,
    MOVEFILE_WRITE_THROUGH, MoveFileExW,
};

/// MAX_PATH.
pub const NOMINAL_PATH_LIMIT: usize = 260;

pub const SUPPORTS_EXTENDED_PREFIX: bool = true;

const ERROR_ACCESS_DENIED: i32 = 5;
const ERROR_NOT_SUPPORTED: i32 = 50;
const ERROR_INVALID_FUNCTION: i32 = 1;

fn wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(once(0)).collect()
}

/// Volume serial number of the volume holding `path`.
pub fn device_id(path: &Path) -> io::Result<u64> {
    let wpath = wide(path.as_os_str());
    let mut root = vec![0u16; 1024];
    let ok = unsafe { GetVolumePathNameW(wpath.as_ptr(), root.as_mut_ptr(), root.len() as u32) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    let mut serial: u32 = 0;
    let ok = unsafe {
        GetVolumeInformationW(
            root.as_ptr(),
            std::ptr::null_mut(),
            0,
            &mut serial,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            0,
        )
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(u64::from(serial))
}

fn move_file_ex(src: &Path, dst: &Path, flags: u32) -> io::Result<()> {
    let s = wide(src.as_os_str());
    let d = wide(dst.as_os_str());
    let ok = unsafe { MoveFileExW(s.as_ptr(), d.as_ptr(), flags) };
    if ok == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// No REPLACE_EXISTING and no COPY_ALLOWED: same-volume rename or failure.
pub fn rename_strict(src: &Path, dst: &Path) -> io::Result<()> {
    move_file_ex(src, dst, MOVEFILE_WRITE_THROUGH)
}

/// Retry that lets the OS copy+delete when a plain rename is refused.
pub fn rename_permissive(src: &Path, dst: &Path) -> io::Result<()> {
    move_file_ex(src, dst, MOVEFILE_COPY_ALLOWED | MOVEFILE_WRITE_THROUGH)
}

pub fn should_escalate(e: &io::Error) -> bool {
    match e.raw_os_error() {
        Some(code) => matches!(
            code,
            ERROR_ACCESS_DENIED | ERROR_NOT_SUPPORTED | ERROR_INVALID_FUNCTION
        ),
        None => e.kind() == io::ErrorKind::PermissionDenied,
    }
}

pub fn free_space_bytes(path: &Path) -> io::Result<u64> {
    let wpath = wide(path.as_os_str());
    let mut free_avail: u64 = 0;
    let mut total: u64 = 0;
    let mut total_free: u64 = 0;
    let ok = unsafe {
        GetDiskFreeSpaceExW(wpath.as_ptr(), &mut free_avail, &mut total, &mut total_free)
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(free_avail)
}

/// Directory fsync is not exposed through std on Windows.
pub fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Open log file for appending (no symlink defense available via std on Windows).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn config_tmp_sibling(target: &Path) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let name = format!(".fxfer.config.tmp.{}.{}", std::process::id(), nanos);
    target.parent().unwrap_or_else(|| Path::new(".")).join(name)
}

/// Write a new config file via temp file + rename. Fails if the target exists.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "config path has no parent"))?;
    fs::create_dir_all(parent)?;

    let tmp = config_tmp_sibling(path);
    let mut f = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
    f.write_all(contents)?;
    f.sync_all()?;
    drop(f);
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// No-op on Windows; POSIX-style directory modes are not applicable.
pub fn set_dir_mode_0700(_path: &Path) -> io::Result<()> {
    Ok(())
}
