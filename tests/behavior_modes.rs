use forensic_transfer::transfer::{StaticTopology, plan};
use forensic_transfer::{
    MoveBehavior, TransferEngine, TransferItem, TransferOperation, TransferOptions,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn make_case(base: &Path) -> PathBuf {
    let case = base.join("case");
    fs::create_dir_all(case.join("b")).unwrap();
    fs::write(case.join("a.txt"), b"alpha").unwrap();
    fs::write(case.join("b/c.txt"), b"charlie").unwrap();
    case
}

fn hashes(result: &forensic_transfer::TransferResult) -> BTreeMap<PathBuf, String> {
    result
        .outcomes()
        .values()
        .map(|o| {
            (
                o.relative_path.clone(),
                o.content_hash.as_ref().unwrap().hex().to_string(),
            )
        })
        .collect()
}

#[test]
fn always_copy_on_same_device_keeps_sources_and_is_repeatable() {
    let td = tempdir().unwrap();
    let case = make_case(td.path());
    let opts = TransferOptions {
        behavior: MoveBehavior::AlwaysCopy,
        ..TransferOptions::default()
    };
    let items = [TransferItem::directory(&case, "case")];

    let first = TransferEngine::new(opts.clone()).run(&items, &td.path().join("one"));
    let second = TransferEngine::new(opts).run(&items, &td.path().join("two"));

    assert!(first.is_success() && second.is_success());
    assert!(case.join("a.txt").exists());
    assert!(
        first
            .outcomes()
            .values()
            .all(|o| o.operation == TransferOperation::Copy)
    );
    assert_eq!(hashes(&first), hashes(&second));
}

#[test]
fn planning_does_not_touch_the_filesystem() {
    let td = tempdir().unwrap();
    let case = make_case(td.path());
    let root = td.path().join("never");

    let p = plan(
        &[TransferItem::directory(&case, "case")],
        &root,
        MoveBehavior::AlwaysCopy,
        &StaticTopology { same_device: true },
    )
    .unwrap();
    assert_eq!(p.exploded_items.len(), 2);
    assert_eq!(p.copy_bytes(), 5 + 7);
    assert!(!root.exists());

    let again = plan(
        &[TransferItem::directory(&case, "case")],
        &root,
        MoveBehavior::AlwaysCopy,
        &StaticTopology { same_device: true },
    )
    .unwrap();
    assert_eq!(p, again);
}

#[test]
fn ask_caller_consults_resolver_with_same_device_items() {
    let td = tempdir().unwrap();
    let case = make_case(td.path());
    let asked = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
    let resolver = {
        let asked = Arc::clone(&asked);
        move |items: &[TransferItem]| {
            asked
                .lock()
                .unwrap()
                .extend(items.iter().map(|i| i.source_path().to_path_buf()));
            MoveBehavior::AlwaysMoveIfPossible
        }
    };
    let opts = TransferOptions {
        behavior: MoveBehavior::AskCaller,
        ..TransferOptions::default()
    };
    let result = TransferEngine::new(opts)
        .with_detector(StaticTopology { same_device: true })
        .with_resolver(resolver)
        .run(&[TransferItem::directory(&case, "case")], &td.path().join("out"));

    assert!(result.is_success());
    assert_eq!(*asked.lock().unwrap(), vec![case.clone()]);
    assert!(!case.exists());
    assert!(
        result
            .outcomes()
            .values()
            .all(|o| o.operation == TransferOperation::Move)
    );
}

#[test]
fn ask_caller_without_resolver_copies() {
    let td = tempdir().unwrap();
    let case = make_case(td.path());
    let opts = TransferOptions {
        behavior: MoveBehavior::AskCaller,
        ..TransferOptions::default()
    };
    let result = TransferEngine::new(opts)
        .with_detector(StaticTopology { same_device: true })
        .run(&[TransferItem::directory(&case, "case")], &td.path().join("out"));

    assert!(result.is_success());
    assert!(case.exists());
    assert_eq!(result.outcomes().len(), 2);
}
