//! XML configuration support.
//! - Loads settings from config.xml (quick_xml).
//! - Creates a commented template on request.
//!
//! Unknown XML fields are an error so misconfigurations surface early.

use anyhow::{Context, Result, anyhow};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{LogLevel, TransferConfig};
use crate::fs_ops::io_error_with_help_anyhow;
use crate::platform::{set_dir_mode_0700, write_config_secure_new_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    same_drive_behavior: Option<String>,
    calculate_hashes: Option<bool>,
    hash_algorithm: Option<String>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    long_path_threshold: Option<u64>,
    extended_paths: Option<bool>,
    preserve_completed_on_failure: Option<bool>,
    preserve_timestamps: Option<bool>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    progress_interval_ms: Option<u64>,
    log_level: Option<String>,
    log_file: Option<String>,
}

// Custom deserializer that trims surrounding whitespace for optional u64
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

// Map XmlConfig -> TransferConfig; absent fields keep their defaults.
fn xml_to_config(parsed: XmlConfig) -> Result<TransferConfig> {
    let mut cfg = TransferConfig::default();

    if let Some(s) = non_empty(parsed.same_drive_behavior.as_deref()) {
        cfg.same_drive_behavior = s.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(v) = parsed.calculate_hashes {
        cfg.calculate_hashes = v;
    }
    if let Some(s) = non_empty(parsed.hash_algorithm.as_deref()) {
        cfg.hash_algorithm = s.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(n) = parsed.long_path_threshold {
        cfg.long_path_threshold = usize::try_from(n).context("long_path_threshold out of range")?;
    }
    if let Some(v) = parsed.extended_paths {
        cfg.extended_paths = v;
    }
    if let Some(v) = parsed.preserve_completed_on_failure {
        cfg.preserve_completed_on_failure = v;
    }
    if let Some(v) = parsed.preserve_timestamps {
        cfg.preserve_timestamps = v;
    }
    if let Some(ms) = parsed.progress_interval_ms {
        cfg.progress_interval = Duration::from_millis(ms);
    }
    if let Some(s) = non_empty(parsed.log_level.as_deref()) {
        cfg.log_level = s.parse::<LogLevel>().map_err(|e| anyhow!(e))?;
    }
    cfg.log_file = non_empty(parsed.log_file.as_deref()).map(PathBuf::from);

    Ok(cfg)
}

/// Parse a config document.
pub fn parse_config_xml(contents: &str) -> Result<TransferConfig> {
    let parsed: XmlConfig = from_xml_str(contents).context("parse config xml")?;
    xml_to_config(parsed)
}

/// Load a TransferConfig from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<TransferConfig> {
    let contents =
        fs::read_to_string(path).map_err(io_error_with_help_anyhow("read config xml", path))?;
    parse_config_xml(&contents).with_context(|| format!("in '{}'", path.display()))
}

/// Load the config at the default location (`FXFER_CONFIG` or the OS config dir).
/// A missing file yields the built-in defaults; a malformed one is an error.
pub fn load_config() -> Result<(TransferConfig, Option<PathBuf>)> {
    let path = default_config_path().context("resolve config path")?;
    if !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok((TransferConfig::default(), None));
    }
    let cfg = load_config_from_xml_path(&path)?;
    debug!(path = %path.display(), "loaded config");
    Ok((cfg, Some(path)))
}

/// Create a commented template config file and its parent directory.
/// Refuses to overwrite an existing file or to write below a symlinked ancestor.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(anyhow!("Refusing to overwrite existing config {}", path.display()));
    }
    if path_has_symlink_ancestor(path)? {
        return Err(anyhow!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        ));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = set_dir_mode_0700(parent);
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/fxfer.log".into());
    let d = TransferConfig::default();

    let content = format!(
        r#"<!--
  fxfer configuration (XML)

    same_drive_behavior            -> auto_move | auto_copy | ask
    calculate_hashes               -> hash every transferred file (true/false)
    hash_algorithm                 -> sha256 | md5
    long_path_threshold            -> path length that switches to extended-length handling
    extended_paths                 -> use the \\?\ prefix where supported (true/false)
    preserve_completed_on_failure  -> keep finished files when a run fails (true/false)
    preserve_timestamps            -> copy modification/access times to copies (true/false)
    progress_interval_ms           -> minimum gap between progress updates
    log_level                      -> quiet | normal | info | debug
    log_file                       -> optional log file path (leave empty to disable)

  CLI flags override XML values.
-->
<config>
  <same_drive_behavior>{}</same_drive_behavior>
  <calculate_hashes>{}</calculate_hashes>
  <hash_algorithm>{}</hash_algorithm>
  <long_path_threshold>{}</long_path_threshold>
  <extended_paths>{}</extended_paths>
  <preserve_completed_on_failure>{}</preserve_completed_on_failure>
  <preserve_timestamps>{}</preserve_timestamps>
  <progress_interval_ms>{}</progress_interval_ms>
  <log_level>{}</log_level>
  <log_file></log_file>
  <!-- suggested log file: {} -->
</config>
"#,
        d.same_drive_behavior,
        d.calculate_hashes,
        d.hash_algorithm,
        d.long_path_threshold,
        d.extended_paths,
        d.preserve_completed_on_failure,
        d.preserve_timestamps,
        d.progress_interval.as_millis(),
        d.log_level,
        suggested_log,
    );

    write_config_secure_new_0600(path, content.as_bytes())?;
    info!("Created template config at {}", path.display());
    Ok(())
}
