use forensic_transfer::{
    NullProgress, TransferItem, TransferOperation, TransferOptions, TransferResult, transfer,
};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn outcome_for<'a>(
    result: &'a TransferResult,
    rel: &str,
) -> &'a forensic_transfer::TransferOutcome {
    result
        .outcomes()
        .values()
        .find(|o| o.relative_path == Path::new(rel))
        .unwrap_or_else(|| panic!("no outcome for {rel}"))
}

#[test]
fn directory_on_same_device_is_renamed_whole() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let case = td.path().join("evidence").join("case_17");
    fs::create_dir_all(case.join("images"))?;
    fs::write(case.join("notes.txt"), b"seized 2024-03-01\n")?;
    fs::write(case.join("images/disk.raw"), vec![7u8; 64 * 1024])?;
    let root = td.path().join("archive");

    let items = [TransferItem::directory(&case, "case_17")];
    let result = transfer(&items, &root, TransferOptions::default(), NullProgress);

    assert!(result.is_success(), "unexpected result: {:?}", result.error());
    assert_eq!(result.status().exit_code(), 0);
    assert!(!case.exists(), "source folder must be gone after a move");
    assert_eq!(fs::read(root.join("case_17/notes.txt"))?, b"seized 2024-03-01\n");

    assert_eq!(result.outcomes().len(), 2);
    let notes = outcome_for(&result, "case_17/notes.txt");
    assert_eq!(notes.operation, TransferOperation::Move);
    assert!(notes.verified);
    assert_eq!(
        notes.content_hash.as_ref().map(|h| h.hex().to_string()),
        Some(sha256_hex(b"seized 2024-03-01\n"))
    );
    let raw = outcome_for(&result, "case_17/images/disk.raw");
    assert_eq!(raw.byte_size, 64 * 1024);

    let m = result.metrics();
    assert_eq!(m.files_processed, 2);
    assert_eq!(m.bytes_copied, 0);
    Ok(())
}

#[test]
fn bare_file_on_same_device_is_moved() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let src = td.path().join("memory.dmp");
    fs::write(&src, b"dump")?;
    let root = td.path().join("archive");

    let items = [TransferItem::file(&src, "dumps/memory.dmp")];
    let result = transfer(&items, &root, TransferOptions::default(), NullProgress);

    assert!(result.is_success());
    assert!(!src.exists());
    assert_eq!(fs::read(root.join("dumps/memory.dmp"))?, b"dump");
    let o = outcome_for(&result, "dumps/memory.dmp");
    assert_eq!(o.operation, TransferOperation::Move);
    assert!(o.verified);
    Ok(())
}

#[test]
fn unhashed_moves_are_not_verified() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let case = td.path().join("case");
    fs::create_dir(&case)?;
    fs::write(case.join("a"), b"a")?;

    let opts = TransferOptions {
        hash_algorithm: None,
        ..TransferOptions::default()
    };
    let result = transfer(
        &[TransferItem::directory(&case, "case")],
        &td.path().join("out"),
        opts,
        NullProgress,
    );
    assert!(result.is_success());
    let o = outcome_for(&result, "case/a");
    assert!(!o.verified);
    assert!(o.content_hash.is_none());
    Ok(())
}

#[test]
fn nested_destinations_on_one_device_move_file_by_file() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let outer = td.path().join("outer");
    let inner = td.path().join("inner");
    fs::create_dir_all(outer.join("docs"))?;
    fs::create_dir(&inner)?;
    fs::write(outer.join("docs/report.pdf"), b"report")?;
    fs::write(inner.join("disk.raw"), b"raw")?;
    let root = td.path().join("archive");

    let items = [
        TransferItem::directory(&outer, "case"),
        TransferItem::directory(&inner, "case/inner"),
    ];
    let result = transfer(&items, &root, TransferOptions::default(), NullProgress);

    assert!(result.is_success(), "unexpected result: {:?}", result.error());
    assert_eq!(result.outcomes().len(), 2);
    for rel in ["case/docs/report.pdf", "case/inner/disk.raw"] {
        let o = outcome_for(&result, rel);
        assert_eq!(o.operation, TransferOperation::Move);
        assert!(o.verified);
    }
    assert_eq!(fs::read(root.join("case/docs/report.pdf"))?, b"report");
    assert_eq!(fs::read(root.join("case/inner/disk.raw"))?, b"raw");
    assert!(!outer.join("docs/report.pdf").exists());
    assert!(!inner.join("disk.raw").exists());
    Ok(())
}

#[test]
fn moved_tree_reports_every_file_on_disk() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let case = td.path().join("case");
    fs::create_dir(&case)?;
    fs::write(case.join("real.bin"), b"real")?;
    fs::write(case.join(".fxfer.1.2.tmp"), b"left by another tool")?;

    let result = transfer(
        &[TransferItem::directory(&case, "case")],
        &td.path().join("out"),
        TransferOptions::default(),
        NullProgress,
    );

    assert!(result.is_success(), "unexpected result: {:?}", result.error());
    assert_eq!(result.outcomes().len(), 2);
    assert!(outcome_for(&result, "case/.fxfer.1.2.tmp").verified);
    assert!(outcome_for(&result, "case/real.bin").verified);
    assert_eq!(result.metrics().files_processed, 2);
    Ok(())
}

#[test]
fn ten_mib_in_three_files_moves_in_under_a_second() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let case = td.path().join("case");
    fs::create_dir(&case)?;
    let sizes = [4 * 1024 * 1024, 4 * 1024 * 1024, 2 * 1024 * 1024];
    for (i, size) in sizes.into_iter().enumerate() {
        fs::write(case.join(format!("part{i}.bin")), vec![i as u8; size])?;
    }

    let opts = TransferOptions {
        hash_algorithm: None,
        ..TransferOptions::default()
    };
    let result = transfer(
        &[TransferItem::directory(&case, "case")],
        &td.path().join("out"),
        opts,
        NullProgress,
    );

    assert!(result.is_success(), "unexpected result: {:?}", result.error());
    let m = result.metrics();
    assert_eq!(m.bytes_processed, 10_485_760);
    assert_eq!(m.bytes_moved, 10_485_760);
    assert_eq!(m.bytes_copied, 0);
    assert!(
        m.elapsed().as_secs_f64() < 1.0,
        "a same-device rename should not stream data: {:?}",
        m.elapsed()
    );
    for i in 0..3 {
        let o = outcome_for(&result, &format!("case/part{i}.bin"));
        assert_eq!(o.operation, TransferOperation::Move);
    }
    Ok(())
}

#[test]
fn ten_mib_in_three_files_moves_verified() -> Result<(), Box<dyn std::error::Error>> {
    let td = tempdir()?;
    let case = td.path().join("case");
    fs::create_dir(&case)?;
    let sizes = [5 * 1024 * 1024, 3 * 1024 * 1024, 2 * 1024 * 1024];
    let mut expected = Vec::new();
    for (i, size) in sizes.into_iter().enumerate() {
        let body = vec![b'a' + i as u8; size];
        expected.push(sha256_hex(&body));
        fs::write(case.join(format!("part{i}.bin")), body)?;
    }

    let result = transfer(
        &[TransferItem::directory(&case, "case")],
        &td.path().join("out"),
        TransferOptions::default(),
        NullProgress,
    );

    assert!(result.is_success(), "unexpected result: {:?}", result.error());
    assert_eq!(result.metrics().bytes_processed, 10_485_760);
    for (i, hex) in expected.iter().enumerate() {
        let o = outcome_for(&result, &format!("case/part{i}.bin"));
        assert!(o.verified);
        assert_eq!(o.content_hash.as_ref().map(|h| h.hex()), Some(hex.as_str()));
    }
    Ok(())
}
