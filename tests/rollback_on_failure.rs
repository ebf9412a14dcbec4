use forensic_transfer::fs_ops::NativeMover;
use forensic_transfer::transfer::StaticTopology;
use forensic_transfer::{
    ErrorKind, FailurePolicy, ProgressSink, RunStatus, TransferEngine, TransferItem,
    TransferOptions, TransferOutcome,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

/// Real renames, except the strict attempt numbered `fail_on` (1-based) fails
/// with an error that does not qualify for escalation.
struct FailNthMove {
    fail_on: usize,
    calls: AtomicUsize,
}

impl FailNthMove {
    fn new(fail_on: usize) -> Self {
        Self {
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }
}

impl NativeMover for FailNthMove {
    fn rename_strict(&self, src: &Path, dst: &Path) -> io::Result<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(io::Error::other("injected device error"));
        }
        fs::rename(src, dst)
    }

    fn rename_permissive(&self, src: &Path, dst: &Path) -> io::Result<()> {
        fs::rename(src, dst)
    }
}

fn three_files(dir: &Path) -> Vec<TransferItem> {
    ["a.bin", "b.bin", "c.bin"]
        .iter()
        .map(|name| {
            let p = dir.join(name);
            fs::write(&p, name.as_bytes()).unwrap();
            TransferItem::file(&p, *name)
        })
        .collect()
}

#[test]
fn failed_move_restores_completed_moves() {
    let td = tempdir().unwrap();
    let src_dir = td.path().join("src");
    fs::create_dir(&src_dir).unwrap();
    let items = three_files(&src_dir);
    let root = td.path().join("dest");

    let result = TransferEngine::new(TransferOptions::default())
        .with_detector(StaticTopology { same_device: true })
        .with_mover(FailNthMove::new(2))
        .run(&items, &root);

    assert_eq!(result.status(), RunStatus::Failure);
    assert_eq!(result.status().exit_code(), 1);
    assert_eq!(result.error().map(|e| e.kind()), Some(ErrorKind::NativeMoveFailed));
    let rb = result.rollback().unwrap();
    assert!(rb.is_complete(), "rollback failures: {:?}", rb.failed);

    for name in ["a.bin", "b.bin", "c.bin"] {
        assert_eq!(fs::read(src_dir.join(name)).unwrap(), name.as_bytes());
    }
    assert!(!root.exists(), "rollback removes the root it created");
}

/// Deletes `victim` once the first file has completed, so a later copy fails.
struct DeleteAfterFirst {
    victim: PathBuf,
}

impl ProgressSink for DeleteAfterFirst {
    fn report(&self, _percent: u8, _message: &str) {}

    fn file_completed(&self, _outcome: &TransferOutcome) {
        let _ = fs::remove_file(&self.victim);
    }
}

#[test]
fn failed_copy_removes_earlier_copies() {
    let td = tempdir().unwrap();
    let src_dir = td.path().join("src");
    fs::create_dir(&src_dir).unwrap();
    let items = three_files(&src_dir);
    let root = td.path().join("dest");
    fs::create_dir(&root).unwrap();

    let result = TransferEngine::new(TransferOptions::default())
        .with_detector(StaticTopology { same_device: false })
        .with_progress(DeleteAfterFirst {
            victim: src_dir.join("c.bin"),
        })
        .run(&items, &root);

    assert_eq!(result.status(), RunStatus::Failure);
    assert_eq!(result.outcomes().len(), 2);
    assert!(result.rollback().unwrap().is_complete());
    assert_eq!(fs::read_dir(&root).unwrap().count(), 0, "copies must be removed");
    assert!(src_dir.join("a.bin").exists());
    assert!(src_dir.join("b.bin").exists());
}

#[test]
fn missing_source_fails_before_touching_destination() {
    let td = tempdir().unwrap();
    let src_dir = td.path().join("src");
    fs::create_dir(&src_dir).unwrap();
    let mut items = three_files(&src_dir);
    items.push(TransferItem::file(src_dir.join("gone.bin"), "gone.bin"));
    let root = td.path().join("dest");

    let result = TransferEngine::new(TransferOptions::default())
        .with_detector(StaticTopology { same_device: false })
        .run(&items, &root);

    assert_eq!(result.error().map(|e| e.kind()), Some(ErrorKind::SourceNotFound));
    assert!(result.outcomes().is_empty());
    assert!(!root.exists());
}

#[test]
fn preserve_completed_keeps_finished_work() {
    let td = tempdir().unwrap();
    let src_dir = td.path().join("src");
    fs::create_dir(&src_dir).unwrap();
    let items = three_files(&src_dir);
    let root = td.path().join("dest");

    let opts = TransferOptions {
        failure_policy: FailurePolicy::PreserveCompleted,
        ..TransferOptions::default()
    };
    let result = TransferEngine::new(opts)
        .with_detector(StaticTopology { same_device: true })
        .with_mover(FailNthMove::new(3))
        .run(&items, &root);

    assert_eq!(result.status(), RunStatus::PartialFailure);
    assert_eq!(result.status().exit_code(), 3);
    assert!(result.rollback().unwrap().preserved);
    assert_eq!(result.outcomes().len(), 2);
    assert!(root.join("a.bin").exists());
    assert!(root.join("b.bin").exists());
    assert!(!src_dir.join("a.bin").exists());
    assert!(src_dir.join("c.bin").exists());
}
