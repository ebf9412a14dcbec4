//! Long-path handling for native moves.
//!
//! Paths past a conservative threshold are rewritten with the Windows
//! extended-length prefix (`\\?\`, or `\\?\UNC\` for UNC shares). Where the
//! prefix is unavailable or disabled, a path beyond the platform's nominal
//! limit is rejected up front instead of letting the OS fail halfway.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::errors::TransferError;
use crate::platform;

/// Measured in characters of the absolute path.
pub const DEFAULT_LONG_PATH_THRESHOLD: usize = 248;

/// Upper bound for extended-length paths.
pub const EXTENDED_PATH_LIMIT: usize = 32_767;

const VERBATIM_PREFIX: &str = r"\\?\";
const VERBATIM_UNC_PREFIX: &str = r"\\?\UNC\";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongPathPolicy {
    pub threshold: usize,
    /// Use the extended prefix when the platform has one.
    pub extended: bool,
    pub prefix_supported: bool,
    pub nominal_limit: usize,
}

impl Default for LongPathPolicy {
    fn default() -> Self {
        Self::for_platform(DEFAULT_LONG_PATH_THRESHOLD, true)
    }
}

/// Paths ready to hand to the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPaths {
    pub src: PathBuf,
    pub dst: PathBuf,
    pub extended: bool,
}

impl LongPathPolicy {
    pub fn for_platform(threshold: usize, extended: bool) -> Self {
        Self {
            threshold,
            extended,
            prefix_supported: platform::SUPPORTS_EXTENDED_PREFIX,
            nominal_limit: platform::NOMINAL_PATH_LIMIT,
        }
    }

    /// Measure both absolute paths and decide how they reach the OS.
    pub fn prepare(&self, src: &Path, dst: &Path) -> Result<PreparedPaths, TransferError> {
        let src = absolute(src)?;
        let dst = absolute(dst)?;
        let src_len = path_len(&src);
        let dst_len = path_len(&dst);
        let (longest, longest_len) = if src_len >= dst_len {
            (&src, src_len)
        } else {
            (&dst, dst_len)
        };

        if longest_len <= self.threshold {
            return Ok(PreparedPaths {
                src,
                dst,
                extended: false,
            });
        }

        if self.extended && self.prefix_supported {
            if longest_len > EXTENDED_PATH_LIMIT {
                return Err(TransferError::PathTooLong {
                    path: longest.clone(),
                    len: longest_len,
                });
            }
            tracing::debug!(len = longest_len, "using extended-length paths");
            return Ok(PreparedPaths {
                src: to_extended(&src),
                dst: to_extended(&dst),
                extended: true,
            });
        }

        if longest_len > self.nominal_limit {
            return Err(TransferError::PathTooLong {
                path: longest.clone(),
                len: longest_len,
            });
        }

        Ok(PreparedPaths {
            src,
            dst,
            extended: false,
        })
    }
}

fn absolute(p: &Path) -> Result<PathBuf, TransferError> {
    std::path::absolute(p).map_err(|e| TransferError::Io {
        path: p.to_path_buf(),
        context: format!("resolve absolute path '{}': {}", p.display(), e),
        source: e,
    })
}

/// Length as the OS counts it: UTF-16 units on Windows, bytes elsewhere.
pub fn path_len(p: &Path) -> usize {
    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        p.as_os_str().encode_wide().count()
    }
    #[cfg(not(windows))]
    {
        p.as_os_str().len()
    }
}

/// Prefix `path` for extended-length access. Already-prefixed paths pass through.
pub fn to_extended(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        let mut out = OsString::from(VERBATIM_PREFIX);
        out.push(path.as_os_str());
        return PathBuf::from(out);
    };
    if s.starts_with(VERBATIM_PREFIX) {
        return path.to_path_buf();
    }
    // Verbatim paths skip normalization, so separators must already be backslashes.
    let normalized = s.replace('/', "\\");
    if let Some(share) = normalized.strip_prefix(r"\\") {
        PathBuf::from(format!("{VERBATIM_UNC_PREFIX}{share}"))
    } else {
        PathBuf::from(format!("{VERBATIM_PREFIX}{normalized}"))
    }
}
