//! Content-addressed blob storage.
//!
//! Every admitted file is copied into the `objects/` directory under a name
//! equal to the SHA-256 digest of its bytes. Identical content therefore
//! always lands on the same object; writing it again overwrites the file
//! with identical bytes, which leaves the store observably unchanged.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{ArchiveError, Result};

/// Length of a rendered fingerprint (hex-encoded SHA-256).
const FINGERPRINT_HEX_LEN: usize = 64;

/// Deterministic identity of a blob: the lowercase hex SHA-256 of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        let well_formed = s.len() == FINGERPRINT_HEX_LEN
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(ArchiveError::InvalidArgument(format!(
                "not a fingerprint (expected {FINGERPRINT_HEX_LEN} lowercase hex chars): {s:?}"
            )))
        }
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = ArchiveError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

/// Directory of immutable blobs keyed by [`Fingerprint`].
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open a store rooted at an existing `objects/` directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the blobs.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the blob for `fingerprint` lives (whether or not it exists).
    pub fn path_of(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(fingerprint.as_str())
    }

    /// Store `bytes`, returning their fingerprint.
    ///
    /// Idempotent: storing the same bytes again rewrites the same object.
    pub fn put(&self, bytes: &[u8]) -> Result<Fingerprint> {
        let fingerprint = Fingerprint::of(bytes);
        let path = self.path_of(&fingerprint);
        std::fs::write(&path, bytes).map_err(ArchiveError::io(&path))?;
        debug!(entry_id = %fingerprint, size = bytes.len(), "Blob stored");
        Ok(fingerprint)
    }

    /// Read back the blob for `fingerprint`.
    pub fn get(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>> {
        let path = self.path_of(fingerprint);
        std::fs::read(&path).map_err(ArchiveError::io(&path))
    }

    /// Whether a blob for `fingerprint` is present.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.path_of(fingerprint).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        // sha256("abc")
        assert_eq!(
            Fingerprint::of(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fingerprint_parse_rejects_garbage() {
        assert!("xyz".parse::<Fingerprint>().is_err());
        let upper = Fingerprint::of(b"abc").as_str().to_uppercase();
        assert!(upper.parse::<Fingerprint>().is_err());
        let fp = Fingerprint::of(b"abc");
        assert_eq!(fp.as_str().parse::<Fingerprint>().unwrap(), fp);
    }

    #[test]
    fn test_fingerprint_serde_is_plain_string() {
        let fp = Fingerprint::of(b"abc");
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{fp}\""));
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
        assert!(serde_json::from_str::<Fingerprint>("\"nope\"").is_err());
    }

    #[test]
    fn test_put_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());

        let first = store.put(b"pixel data").unwrap();
        let second = store.put(b"pixel data").unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(store.get(&first).unwrap(), b"pixel data");
    }

    #[test]
    fn test_distinct_content_distinct_objects() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());

        let a = store.put(b"a").unwrap();
        let b = store.put(b"b").unwrap();
        assert_ne!(a, b);
        assert!(store.contains(&a));
        assert!(store.contains(&b));
    }

    #[test]
    fn test_get_missing_blob_is_io_failure() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let missing = Fingerprint::of(b"never stored");
        assert!(!store.contains(&missing));
        assert!(matches!(store.get(&missing), Err(ArchiveError::Io { .. })));
    }

    #[test]
    fn test_put_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path().join("does-not-exist"));
        assert!(matches!(store.put(b"x"), Err(ArchiveError::Io { .. })));
    }
}
