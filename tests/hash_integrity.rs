use forensic_transfer::transfer::StaticTopology;
use forensic_transfer::transfer::hashing::hash_file;
use forensic_transfer::{HashAlgorithm, TransferEngine, TransferItem, TransferOptions};
use std::fs;
use tempfile::tempdir;

#[test]
fn md5_and_sha256_digests_match_known_vectors() {
    let td = tempdir().unwrap();
    let f = td.path().join("abc.txt");
    fs::write(&f, b"abc").unwrap();

    let sha = hash_file(&f, HashAlgorithm::Sha256, |_| Ok(())).unwrap();
    assert_eq!(
        sha.hex(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    let md5 = hash_file(&f, HashAlgorithm::Md5, |_| Ok(())).unwrap();
    assert_eq!(md5.hex(), "900150983cd24fb0d6963f7d28e17f72");
}

#[test]
fn copy_with_md5_records_matching_hashes() {
    let td = tempdir().unwrap();
    let src = td.path().join("abc.txt");
    fs::write(&src, b"abc").unwrap();
    let opts = TransferOptions {
        hash_algorithm: Some(HashAlgorithm::Md5),
        ..TransferOptions::default()
    };

    let result = TransferEngine::new(opts)
        .with_detector(StaticTopology { same_device: false })
        .run(&[TransferItem::file(&src, "abc.txt")], &td.path().join("out"));

    assert!(result.is_success());
    let o = result.outcomes().values().next().unwrap();
    assert!(o.verified);
    let hash = o.content_hash.as_ref().unwrap();
    assert_eq!(hash.algorithm(), HashAlgorithm::Md5);
    assert_eq!(hash.hex(), "900150983cd24fb0d6963f7d28e17f72");
    assert_eq!(o.source_hash.as_ref(), Some(hash));
}

#[test]
fn empty_files_hash_and_verify() {
    let td = tempdir().unwrap();
    let src = td.path().join("empty");
    fs::write(&src, b"").unwrap();

    let result = TransferEngine::new(TransferOptions::default())
        .with_detector(StaticTopology { same_device: false })
        .run(&[TransferItem::file(&src, "empty")], &td.path().join("out"));

    assert!(result.is_success());
    let o = result.outcomes().values().next().unwrap();
    assert_eq!(o.byte_size, 0);
    assert!(o.verified);
    assert_eq!(
        o.content_hash.as_ref().unwrap().hex(),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}
