//! Content hashing.
//!
//! SHA-256 is the default; MD5 is kept for parity with older case manifests.
//! Digests are lowercase hex, tagged with the algorithm that produced them.

use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::errors::TransferError;
use crate::fs_ops::helpers::io_error_with_help;
use crate::fs_ops::io_copy::buffer_size_for;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Md5,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Md5 => write!(f, "md5"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(Self::Sha256),
            "md5" => Ok(Self::Md5),
            other => Err(format!("unknown hash algorithm '{other}' (expected sha256 or md5)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentHash {
    algorithm: HashAlgorithm,
    hex: String,
}

impl ContentHash {
    pub fn new(algorithm: HashAlgorithm, hex: String) -> Self {
        ContentHash { algorithm, hex }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

/// Incremental hasher fed chunk by chunk during copy and verification.
pub enum StreamHasher {
    Sha256(sha2::Sha256),
    Md5(md5::Context),
}

impl StreamHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => StreamHasher::Sha256(sha2::Sha256::default()),
            HashAlgorithm::Md5 => StreamHasher::Md5(md5::Context::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            StreamHasher::Sha256(h) => h.update(data),
            StreamHasher::Md5(ctx) => ctx.consume(data),
        }
    }

    pub fn finalize(self) -> ContentHash {
        match self {
            StreamHasher::Sha256(h) => {
                ContentHash::new(HashAlgorithm::Sha256, format!("{:x}", h.finalize()))
            }
            StreamHasher::Md5(ctx) => {
                ContentHash::new(HashAlgorithm::Md5, format!("{:x}", ctx.compute()))
            }
        }
    }
}

/// Hash a file from disk, calling `checkpoint` between chunks.
pub fn hash_file<F>(
    path: &Path,
    algorithm: HashAlgorithm,
    mut checkpoint: F,
) -> Result<ContentHash, TransferError>
where
    F: FnMut(usize) -> Result<(), TransferError>,
{
    let mut file = File::open(path).map_err(io_error_with_help("open for hashing", path))?;
    let len = file
        .metadata()
        .map_err(io_error_with_help("stat for hashing", path))?
        .len();
    let mut buf = vec![0u8; buffer_size_for(len)];
    let mut hasher = StreamHasher::new(algorithm);
    loop {
        let n = file
            .read(&mut buf)
            .map_err(io_error_with_help("read for hashing", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        checkpoint(n)?;
    }
    Ok(hasher.finalize())
}

/// Reads a written destination back to produce the hash it is verified by.
pub trait DestinationHasher: Send + Sync {
    fn hash_destination(
        &self,
        path: &Path,
        algorithm: HashAlgorithm,
        on_chunk: &mut dyn FnMut(usize) -> Result<(), TransferError>,
    ) -> Result<ContentHash, TransferError>;
}

/// Hashes the destination straight from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskHasher;

impl DestinationHasher for DiskHasher {
    fn hash_destination(
        &self,
        path: &Path,
        algorithm: HashAlgorithm,
        on_chunk: &mut dyn FnMut(usize) -> Result<(), TransferError>,
    ) -> Result<ContentHash, TransferError> {
        hash_file(path, algorithm, on_chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn sha256_known_vector() {
        let mut h = StreamHasher::new(HashAlgorithm::Sha256);
        h.update(b"abc");
        assert_eq!(
            h.finalize().hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn md5_known_vector() {
        let mut h = StreamHasher::new(HashAlgorithm::Md5);
        h.update(b"abc");
        assert_eq!(h.finalize().hex(), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn chunked_updates_match_single_update() {
        let mut a = StreamHasher::new(HashAlgorithm::Sha256);
        a.update(b"hello ");
        a.update(b"world");
        let mut b = StreamHasher::new(HashAlgorithm::Sha256);
        b.update(b"hello world");
        assert_eq!(a.finalize(), b.finalize());
    }

    #[test]
    fn file_hash_matches_stream_hash() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("f.bin");
        fs::write(&p, b"abc").unwrap();
        let digest = hash_file(&p, HashAlgorithm::Sha256, |_| Ok(())).unwrap();
        assert!(digest.hex().starts_with("ba7816bf"));
        assert_eq!(digest.algorithm(), HashAlgorithm::Sha256);
    }

    #[test]
    fn checkpoint_error_aborts_hashing() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("f.bin");
        fs::write(&p, vec![7u8; 1024]).unwrap();
        let err = hash_file(&p, HashAlgorithm::Md5, |_| Err(TransferError::Cancelled)).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn parse_accepts_common_spellings() {
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!(" md5 ".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert!("crc32".parse::<HashAlgorithm>().is_err());
    }
}
