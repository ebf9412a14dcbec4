use forensic_transfer::transfer::StaticTopology;
use forensic_transfer::{HashManifest, TransferEngine, TransferItem, TransferOptions};
use std::fs;
use tempfile::tempdir;

fn run_copy(td: &std::path::Path) -> forensic_transfer::TransferResult {
    let case = td.join("case, 17");
    fs::create_dir_all(&case).unwrap();
    fs::write(case.join("a.txt"), b"abc").unwrap();
    fs::write(case.join("b.txt"), b"").unwrap();
    TransferEngine::new(TransferOptions::default())
        .with_detector(StaticTopology { same_device: false })
        .run(&[TransferItem::directory(&case, "case, 17")], &td.join("out"))
}

#[test]
fn csv_manifest_has_header_and_one_row_per_file() {
    let td = tempdir().unwrap();
    let result = run_copy(td.path());
    assert!(result.is_success());

    let manifest = HashManifest::from_outcomes(result.outcomes());
    assert_eq!(manifest.verified_count(), 2);
    let path = td.path().join("manifest.csv");
    manifest.write_csv(&path).unwrap();
    let text = fs::read_to_string(&path).unwrap();

    assert!(text.starts_with("# Transfer Hash Manifest\n"));
    assert!(text.contains("# Algorithm: SHA256\n"));
    assert!(text.contains("Source Hash (SHA256)"));
    let rows: Vec<&str> = text
        .lines()
        .filter(|l| !l.starts_with('#') && !l.is_empty())
        .collect();
    assert_eq!(rows.len(), 3, "header plus two files:\n{text}");
    let abc = rows.iter().find(|r| r.contains("a.txt")).unwrap();
    assert!(abc.contains("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"));
    assert!(abc.contains(",copy,"));
    assert!(abc.ends_with(",true,SUCCESS"));
    assert!(abc.contains("\"case, 17"), "comma-bearing paths are quoted: {abc}");
}

#[test]
fn json_manifest_round_trips_through_serde_json() {
    let td = tempdir().unwrap();
    let result = run_copy(td.path());
    let manifest = HashManifest::from_outcomes(result.outcomes());
    let path = td.path().join("manifest.json");
    manifest.write_json(&path).unwrap();

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(v["algorithm"], "sha256");
    let entries = v["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e["verified"] == true));
    assert!(entries.iter().all(|e| e["operation"] == "copy"));
}
