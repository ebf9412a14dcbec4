//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors for safety.

use anyhow::{Result, anyhow};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CONFIG_ENV_VAR;

const APP_DIR: &str = "forensic_transfer";

/// Config path: `FXFER_CONFIG` if set (a directory gets `config.xml` appended,
/// a relative path is taken from the current directory), else the OS config dir.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(raw) = env::var_os(CONFIG_ENV_VAR) {
        let mut p = PathBuf::from(raw);
        if p.as_os_str().is_empty() {
            return Err(anyhow!("{CONFIG_ENV_VAR} is set but empty"));
        }
        if p.is_relative() {
            p = env::current_dir()?.join(p);
        }
        if p.is_dir() {
            p.push("config.xml");
        }
        return Ok(p);
    }
    if let Some(base) = config_dir() {
        return Ok(base.join(APP_DIR).join("config.xml"));
    }
    env::var_os("HOME")
        .map(|h| PathBuf::from(h).join(".config").join(APP_DIR).join("config.xml"))
        .ok_or_else(|| anyhow!("cannot determine a config directory"))
}

/// Default log path: next to an env-selected config, else the OS data dir.
pub fn default_log_path() -> Result<PathBuf> {
    if env::var_os(CONFIG_ENV_VAR).is_some() {
        let cfg = default_config_path()?;
        if let Some(parent) = cfg.parent() {
            return Ok(parent.join("fxfer.log"));
        }
    }
    if let Some(base) = data_dir() {
        return Ok(base.join(APP_DIR).join("fxfer.log"));
    }
    env::var_os("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".local")
                .join("share")
                .join(APP_DIR)
                .join("fxfer.log")
        })
        .ok_or_else(|| anyhow!("cannot determine a data directory"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
