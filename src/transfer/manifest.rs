//! Hash manifests for completed runs, as CSV or JSON.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{ErrorKind, TransferError};
use crate::fs_ops::helpers::io_error_with_help;
use crate::transfer::hashing::HashAlgorithm;
use crate::transfer::item::TransferOperation;
use crate::transfer::outcome::OutcomeMap;

#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub relative_path: PathBuf,
    pub byte_size: u64,
    pub operation: TransferOperation,
    pub source_hash: Option<String>,
    pub destination_hash: Option<String>,
    pub verified: bool,
    pub error: Option<ErrorKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HashManifest {
    pub generated: DateTime<Local>,
    pub algorithm: Option<HashAlgorithm>,
    pub entries: Vec<ManifestEntry>,
}

impl HashManifest {
    pub fn from_outcomes(outcomes: &OutcomeMap) -> Self {
        let algorithm = outcomes
            .values()
            .find_map(|o| o.content_hash.as_ref().map(|h| h.algorithm()));
        let entries = outcomes
            .values()
            .map(|o| ManifestEntry {
                source_path: o.source_path.clone(),
                destination_path: o.destination_path.clone(),
                relative_path: o.relative_path.clone(),
                byte_size: o.byte_size,
                operation: o.operation,
                source_hash: o.source_hash.as_ref().map(|h| h.hex().to_string()),
                destination_hash: o.content_hash.as_ref().map(|h| h.hex().to_string()),
                verified: o.verified,
                error: o.error,
            })
            .collect();
        Self {
            generated: Local::now(),
            algorithm,
            entries,
        }
    }

    pub fn verified_count(&self) -> usize {
        self.entries.iter().filter(|e| e.verified).count()
    }

    pub fn to_csv_string(&self) -> String {
        let alg = self
            .algorithm
            .map(|a| a.to_string().to_uppercase())
            .unwrap_or_else(|| "NONE".to_string());
        let mut out = String::new();
        out.push_str("# Transfer Hash Manifest\n");
        out.push_str(&format!("# Generated: {}\n", self.generated.format("%Y-%m-%d %H:%M:%S")));
        out.push_str(&format!("# Algorithm: {alg}\n"));
        out.push_str(&format!("# Total Files: {}\n", self.entries.len()));
        out.push_str(&format!("# Verified: {}\n", self.verified_count()));
        out.push('\n');

        let header = [
            "Source Path".to_string(),
            "Destination Path".to_string(),
            "Relative Path".to_string(),
            "File Size (bytes)".to_string(),
            "Operation".to_string(),
            format!("Source Hash ({alg})"),
            format!("Destination Hash ({alg})"),
            "Verified".to_string(),
            "Status".to_string(),
        ];
        push_row(&mut out, header.iter().map(String::as_str));

        for e in &self.entries {
            let status = match e.error {
                None => "SUCCESS".to_string(),
                Some(kind) => kind.as_str().to_uppercase(),
            };
            let row = [
                e.source_path.display().to_string(),
                e.destination_path.display().to_string(),
                e.relative_path.display().to_string(),
                e.byte_size.to_string(),
                e.operation.to_string(),
                e.source_hash.clone().unwrap_or_default(),
                e.destination_hash.clone().unwrap_or_default(),
                e.verified.to_string(),
                status,
            ];
            push_row(&mut out, row.iter().map(String::as_str));
        }
        out
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), TransferError> {
        fs::write(path, self.to_csv_string())
            .map_err(io_error_with_help("write CSV manifest", path))
    }

    pub fn write_json(&self, path: &Path) -> Result<(), TransferError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| TransferError::Io {
            path: path.to_path_buf(),
            context: format!("serialize manifest: {e}"),
            source: std::io::Error::other(e),
        })?;
        fs::write(path, json).map_err(io_error_with_help("write JSON manifest", path))
    }
}

fn push_row<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for f in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&escape_csv(f));
    }
    out.push('\n');
}

fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
