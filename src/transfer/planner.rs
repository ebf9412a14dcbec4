//! Transfer planning.
//!
//! Splits caller items into directories that can be renamed whole
//! (`intact_moves`) and a flat list of files (`exploded_items`). Planning only
//! reads the filesystem.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::errors::TransferError;
use crate::fs_ops::helpers::classify_io;
use crate::transfer::device::DeviceDetector;
use crate::transfer::item::{ItemKind, MoveBehavior, TransferItem, TransferOperation};

/// One file to transfer individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplodedItem {
    pub source: PathBuf,
    /// Relative to the destination root; includes the parent item's folder name.
    pub relative_path: PathBuf,
    pub operation: TransferOperation,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferPlan {
    pub intact_moves: Vec<TransferItem>,
    pub exploded_items: Vec<ExplodedItem>,
}

impl TransferPlan {
    pub fn is_empty(&self) -> bool {
        self.intact_moves.is_empty() && self.exploded_items.is_empty()
    }

    /// Planned unit count: one per intact directory plus one per exploded file.
    pub fn item_count(&self) -> usize {
        self.intact_moves.len() + self.exploded_items.len()
    }

    pub fn copy_bytes(&self) -> u64 {
        self.exploded_items
            .iter()
            .filter(|e| e.operation == TransferOperation::Copy)
            .map(|e| e.size)
            .sum()
    }

    pub fn copy_count(&self) -> usize {
        self.exploded_items
            .iter()
            .filter(|e| e.operation == TransferOperation::Copy)
            .count()
    }

    pub fn move_count(&self) -> usize {
        self.intact_moves.len() + self.exploded_items.len() - self.copy_count()
    }
}

/// Build the plan. `AskCaller` must already be resolved; if it reaches here it
/// is treated as `AlwaysCopy`.
pub fn plan(
    items: &[TransferItem],
    destination_root: &Path,
    behavior: MoveBehavior,
    detector: &dyn DeviceDetector,
) -> Result<TransferPlan, TransferError> {
    let allow_move = behavior == MoveBehavior::AlwaysMoveIfPossible;
    let mut checked = Vec::with_capacity(items.len());
    for item in items {
        checked.push(check_item(item, destination_root)?);
    }

    let mut out = TransferPlan::default();
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    for (idx, (item, meta)) in checked.iter().enumerate() {
        let src = item.source_path();
        let rel = item.relative_destination_path();
        let same = allow_move && detector.same_device(src, destination_root);
        let file_op = if same {
            TransferOperation::Move
        } else {
            TransferOperation::Copy
        };

        if !meta.is_dir() {
            claim(&mut claimed, rel)?;
            out.exploded_items.push(ExplodedItem {
                source: src.to_path_buf(),
                relative_path: rel.to_path_buf(),
                operation: file_op,
                size: meta.len(),
            });
            continue;
        }

        let nested = checked.iter().enumerate().any(|(other, (o, _))| {
            other != idx && destinations_nest(rel, o.relative_destination_path())
        });
        if same && !nested {
            claim(&mut claimed, rel)?;
            out.intact_moves.push(TransferItem::clone(item));
            continue;
        }
        if same {
            debug!(
                src = %src.display(),
                rel = %rel.display(),
                "destination nests with another item; moving file by file"
            );
        }
        for file in walk_files(src)? {
            let relative_path = rel.join(&file.relative);
            claim(&mut claimed, &relative_path)?;
            out.exploded_items.push(ExplodedItem {
                source: file.path,
                relative_path,
                operation: file_op,
                size: file.size,
            });
        }
    }

    info!(
        intact = out.intact_moves.len(),
        files = out.exploded_items.len(),
        copy_bytes = out.copy_bytes(),
        %behavior,
        "transfer planned"
    );
    Ok(out)
}

/// Validate one item against the filesystem and return its metadata.
fn check_item<'a>(
    item: &'a TransferItem,
    destination_root: &Path,
) -> Result<(&'a TransferItem, fs::Metadata), TransferError> {
    item.validate()?;
    let src = item.source_path();
    let meta = fs::metadata(src).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TransferError::SourceNotFound(src.to_path_buf()),
        _ => classify_io("stat source", src, e),
    })?;
    if meta.is_dir() != (item.kind() == ItemKind::Directory) {
        return Err(TransferError::InvalidItem {
            path: src.to_path_buf(),
            reason: format!("declared as {:?} but is not", item.kind()),
        });
    }
    if meta.is_dir()
        && let Ok(canon) = dunce::canonicalize(src)
        && destination_root.starts_with(&canon)
    {
        return Err(TransferError::InvalidItem {
            path: src.to_path_buf(),
            reason: format!(
                "destination root '{}' lies inside this source directory",
                destination_root.display()
            ),
        });
    }
    Ok((item, meta))
}

/// A directory renamed whole must own its destination subtree outright.
fn destinations_nest(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

fn claim(claimed: &mut HashSet<PathBuf>, rel: &Path) -> Result<(), TransferError> {
    if !claimed.insert(rel.to_path_buf()) {
        return Err(TransferError::DuplicateDestination(rel.to_path_buf()));
    }
    Ok(())
}

struct WalkedFile {
    path: PathBuf,
    relative: PathBuf,
    size: u64,
}

/// Regular files below `dir`, sorted by name for a stable plan.
fn walk_files(dir: &Path) -> Result<Vec<WalkedFile>, TransferError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            match e.into_io_error() {
                Some(io) => classify_io("walk source directory", &path, io),
                None => TransferError::InvalidItem {
                    path,
                    reason: "filesystem loop while walking".into(),
                },
            }
        })?;
        let ft = entry.file_type();
        if ft.is_symlink() {
            debug!(path = %entry.path().display(), "skipping symlink");
            continue;
        }
        if !ft.is_file() {
            continue;
        }
        let size = entry
            .metadata()
            .map_err(|e| TransferError::InvalidItem {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?
            .len();
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(entry.file_name()));
        files.push(WalkedFile {
            path: entry.path().to_path_buf(),
            relative,
            size,
        });
    }
    Ok(files)
}
