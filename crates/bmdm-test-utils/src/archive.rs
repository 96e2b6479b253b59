//! Archive fixtures.
//!
//! [`TestArchive`] boots a fresh archive inside a temporary directory and
//! offers a scratch "inbox" next to it for writing input files.

use std::path::{Path, PathBuf};

use bmdm_core::{Archive, BootOutcome};
use tempfile::TempDir;

/// A booted archive plus an input directory, both deleted on drop.
pub struct TestArchive {
    pub archive: Archive,
    inbox: PathBuf,
    _temp_dir: TempDir,
}

impl TestArchive {
    /// Boot an empty archive in a new temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let root = temp_dir.path().join(".bmdm");
        let outcome = Archive::boot(&root).expect("failed to boot test archive");
        assert_eq!(outcome, BootOutcome::Created);
        let archive = Archive::open(&root).expect("failed to open test archive");

        let inbox = temp_dir.path().join("inbox");
        std::fs::create_dir(&inbox).expect("failed to create inbox");

        Self {
            archive,
            inbox,
            _temp_dir: temp_dir,
        }
    }

    /// Directory for input files; never scanned unless passed to `admit`.
    pub fn inbox(&self) -> &Path {
        &self.inbox
    }

    pub fn root(&self) -> &Path {
        self.archive.layout().root()
    }

    /// Write `contents` to `inbox/<name>` and return its path.
    pub fn write_input(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.inbox.join(name);
        std::fs::write(&path, contents).expect("failed to write input file");
        path
    }

    /// Write and admit a single file, asserting it produced a record.
    pub fn admit_new(&self, name: &str, contents: impl AsRef<[u8]>) -> bmdm_core::Record {
        let path = self.write_input(name, contents);
        let mut report = self.archive.admit(&path).expect("admission failed");
        assert_eq!(report.admitted.len(), 1, "{name} was not admitted");
        report.admitted.remove(0)
    }

    /// Number of history lines written so far.
    pub fn history_len(&self) -> usize {
        self.archive.history(None).expect("failed to read history").len()
    }

    /// Number of records in the index.
    pub fn index_len(&self) -> usize {
        self.archive.index().expect("failed to read index").len()
    }
}

impl Default for TestArchive {
    fn default() -> Self {
        Self::new()
    }
}
