//! Transfer inputs: items, behaviors and operations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::errors::TransferError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Directory,
}

/// One caller-supplied unit of work. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    kind: ItemKind,
    source_path: PathBuf,
    relative_destination_path: PathBuf,
}

impl TransferItem {
    pub fn file(source: impl Into<PathBuf>, relative_destination: impl Into<PathBuf>) -> Self {
        Self {
            kind: ItemKind::File,
            source_path: source.into(),
            relative_destination_path: relative_destination.into(),
        }
    }

    pub fn directory(source: impl Into<PathBuf>, relative_destination: impl Into<PathBuf>) -> Self {
        Self {
            kind: ItemKind::Directory,
            source_path: source.into(),
            relative_destination_path: relative_destination.into(),
        }
    }

    /// Build an item from an existing path, landing under its own name.
    pub fn from_path(source: impl AsRef<Path>) -> Result<Self, TransferError> {
        let source = source.as_ref();
        let meta = fs::metadata(source).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TransferError::SourceNotFound(source.to_path_buf()),
            _ => crate::fs_ops::helpers::classify_io("stat source", source, e),
        })?;
        let name = source.file_name().ok_or_else(|| TransferError::InvalidItem {
            path: source.to_path_buf(),
            reason: "source has no final path component".into(),
        })?;
        Ok(if meta.is_dir() {
            Self::directory(source, name)
        } else {
            Self::file(source, name)
        })
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn relative_destination_path(&self) -> &Path {
        &self.relative_destination_path
    }

    /// The relative destination must stay strictly below the destination root.
    pub(crate) fn validate(&self) -> Result<(), TransferError> {
        let rel = &self.relative_destination_path;
        let invalid = |reason: &str| TransferError::InvalidItem {
            path: self.source_path.clone(),
            reason: reason.to_string(),
        };
        if rel.as_os_str().is_empty() {
            return Err(invalid("relative destination is empty"));
        }
        for c in rel.components() {
            match c {
                Component::Normal(_) => {}
                Component::CurDir => return Err(invalid("relative destination contains '.'")),
                Component::ParentDir => {
                    return Err(invalid("relative destination escapes the root via '..'"));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("relative destination must not be absolute"));
                }
            }
        }
        Ok(())
    }
}

/// Caller preference for same-device items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveBehavior {
    #[default]
    AlwaysMoveIfPossible,
    AlwaysCopy,
    AskCaller,
}

impl fmt::Display for MoveBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MoveBehavior::AlwaysMoveIfPossible => "auto_move",
            MoveBehavior::AlwaysCopy => "auto_copy",
            MoveBehavior::AskCaller => "ask",
        };
        f.write_str(s)
    }
}

impl FromStr for MoveBehavior {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "auto_move" | "move" | "always_move_if_possible" => Ok(Self::AlwaysMoveIfPossible),
            "auto_copy" | "copy" | "always_copy" => Ok(Self::AlwaysCopy),
            "ask" | "ask_caller" => Ok(Self::AskCaller),
            other => Err(format!(
                "invalid behavior '{other}' (expected auto_move, auto_copy or ask)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferOperation {
    Move,
    Copy,
}

impl fmt::Display for TransferOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOperation::Move => f.write_str("move"),
            TransferOperation::Copy => f.write_str("copy"),
        }
    }
}
