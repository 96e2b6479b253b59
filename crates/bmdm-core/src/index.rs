//! The archive index: every admitted [`Record`], in admission order.
//!
//! The index is a single JSON array on disk. It is read whole, mutated in
//! memory, and written back whole after every change; there is no partial
//! update and no locking.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::record::Record;

/// In-memory snapshot of the index file, bound to its on-disk location.
#[derive(Debug)]
pub struct Index {
    path: PathBuf,
    records: Vec<Record>,
}

impl Index {
    /// Write an empty index at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let index = Self {
            path: path.into(),
            records: Vec::new(),
        };
        index.save()?;
        Ok(index)
    }

    /// Read the index at `path`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = std::fs::read(&path).map_err(ArchiveError::io(&path))?;
        let records: Vec<Record> =
            serde_json::from_slice(&raw).map_err(ArchiveError::parse(&path))?;
        debug!(path = %path.display(), records = records.len(), "Index loaded");
        Ok(Self { path, records })
    }

    /// Replace the on-disk index with the current snapshot.
    ///
    /// The new content is written beside the index and renamed over it, so
    /// readers never observe a half-written file.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.records)
            .map_err(ArchiveError::serialize(&self.path))?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, json).map_err(ArchiveError::io(&staging))?;
        std::fs::rename(&staging, &self.path).map_err(ArchiveError::io(&self.path))?;
        debug!(path = %self.path.display(), records = self.records.len(), "Index saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, in insertion order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append `record` and persist the index.
    ///
    /// Records are never merged: appending a record whose `entry_id` is
    /// already present adds a second entry.
    pub fn append(&mut self, record: Record) -> Result<()> {
        self.records.push(record);
        self.save()
    }

    /// Lazily yield the records satisfying `predicate`, in insertion order.
    ///
    /// Each call re-scans the current snapshot.
    pub fn find<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a Record> + 'a
    where
        P: Fn(&Record) -> bool + 'a,
    {
        self.records.iter().filter(move |r| predicate(r))
    }

    /// Apply `mutation` to every record whose `entry_id` or `filename`
    /// equals `target`, then persist. Returns how many records matched.
    ///
    /// If `mutation` fails, nothing is written; the error is returned and
    /// the in-memory snapshot may be partially mutated.
    pub fn update_in_place<F>(&mut self, target: &str, mut mutation: F) -> Result<usize>
    where
        F: FnMut(&mut Record) -> Result<()>,
    {
        let mut matched = 0;
        for record in self.records.iter_mut().filter(|r| r.matches_target(target)) {
            mutation(record)?;
            matched += 1;
        }
        self.save()?;
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Extracted, PatternExtractor};
    use crate::store::Fingerprint;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(name: &str, content: &[u8]) -> Record {
        let fields = PatternExtractor::parse_name(name).unwrap();
        Record::new(Fingerprint::of(content), Extracted::Pattern(fields))
    }

    fn new_index(dir: &TempDir) -> Index {
        Index::create(dir.path().join("index.json")).unwrap()
    }

    #[test]
    fn test_create_writes_empty_array() {
        let dir = TempDir::new().unwrap();
        let index = new_index(&dir);
        assert!(index.is_empty());
        let raw = std::fs::read_to_string(index.path()).unwrap();
        assert_eq!(raw.trim(), "[]");
    }

    #[test]
    fn test_append_persists_in_order() {
        let dir = TempDir::new().unwrap();
        let mut index = new_index(&dir);
        index.append(record("P1_d_CT_a.txt", b"1")).unwrap();
        index.append(record("P2_d_MR_b.txt", b"2")).unwrap();
        index.append(record("P1_d_CT_a.txt", b"1")).unwrap();

        let reloaded = Index::load(index.path()).unwrap();
        assert_eq!(reloaded.len(), 3);
        let ids: Vec<&str> = reloaded
            .records()
            .iter()
            .map(|r| r.get_str("patient_id").unwrap())
            .collect();
        assert_eq!(ids, vec!["P1", "P2", "P1"]);
        assert_eq!(reloaded.records()[0].entry_id(), reloaded.records()[2].entry_id());
    }

    #[test]
    fn test_find_is_restartable() {
        let dir = TempDir::new().unwrap();
        let mut index = new_index(&dir);
        index.append(record("P1_d_CT_a.txt", b"1")).unwrap();
        index.append(record("P2_d_MR_b.txt", b"2")).unwrap();

        let is_ct = |r: &Record| r.field_equals("modality", "CT");
        assert_eq!(index.find(is_ct).count(), 1);
        assert_eq!(index.find(is_ct).count(), 1);
        assert_eq!(index.find(|_| true).count(), 2);
    }

    #[test]
    fn test_update_in_place_matches_all_targets() {
        let dir = TempDir::new().unwrap();
        let mut index = new_index(&dir);
        index.append(record("P1_d_CT_same.txt", b"1")).unwrap();
        index.append(record("P2_d_MR_same.txt", b"2")).unwrap();
        index.append(record("P3_d_US_other.txt", b"3")).unwrap();

        let matched = index
            .update_in_place("same.txt", |r| r.set_field("reviewed", "yes").map(drop))
            .unwrap();
        assert_eq!(matched, 2);

        let reloaded = Index::load(index.path()).unwrap();
        let reviewed: Vec<bool> = reloaded
            .records()
            .iter()
            .map(|r| r.field_equals("reviewed", "yes"))
            .collect();
        assert_eq!(reviewed, vec![true, true, false]);
    }

    #[test]
    fn test_update_in_place_without_match_still_saves() {
        let dir = TempDir::new().unwrap();
        let mut index = new_index(&dir);
        index.append(record("P1_d_CT_a.txt", b"1")).unwrap();
        let matched = index.update_in_place("nothing", |_| Ok(())).unwrap();
        assert_eq!(matched, 0);
        assert_eq!(Index::load(index.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_mutation_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let mut index = new_index(&dir);
        index.append(record("P1_d_CT_a.txt", b"1")).unwrap();

        let result = index.update_in_place("a.txt", |r| r.set_field("entry_id", "x").map(drop));
        assert!(result.is_err());
        let reloaded = Index::load(index.path()).unwrap();
        assert_eq!(reloaded.records()[0].entry_id(), &Fingerprint::of(b"1"));
    }

    #[test]
    fn test_load_corrupt_index_is_parse_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();
        assert!(matches!(Index::load(&path), Err(ArchiveError::Parse { .. })));
    }

    #[test]
    fn test_load_missing_index_is_io_failure() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Index::load(dir.path().join("index.json")),
            Err(ArchiveError::Io { .. })
        ));
    }
}
