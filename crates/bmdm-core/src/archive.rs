//! The archive repository: one handle over the on-disk layout.
//!
//! ```text
//! <root>/
//! ├── config.toml     operator identity
//! ├── index.json      every record, rewritten on each mutation
//! ├── objects/        one blob per entry_id
//! └── activity.hist   append-only history
//! ```
//!
//! [`Archive`] owns typed handles to each piece and exposes the mutating
//! operations (admit, tag) and the read-only ones (find, stats, history).
//! Every mutation is persisted before the next one starts, so an aborted
//! batch leaves exactly the completed prefix admitted and audited.

use std::path::{Path, PathBuf};

use bmdm_config::ArchiveConfig;
use tracing::{debug, info, warn};

use crate::audit::{AuditAction, AuditEvent, AuditLog};
use crate::error::{ArchiveError, Result};
use crate::extract::ExtractorRegistry;
use crate::index::Index;
use crate::query::{Query, QueryEngine, Stats};
use crate::record::{self, Record, TagAssignment};
use crate::store::{ContentStore, Fingerprint};

/// Archive directory used when none is given.
pub const DEFAULT_ROOT: &str = ".bmdm";

/// File and directory names inside an archive root.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    root: PathBuf,
}

impl ArchiveLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join("activity.hist")
    }

    /// Whether every required piece of the layout is present.
    pub fn is_initialized(&self) -> bool {
        self.index_path().is_file() && self.objects_dir().is_dir() && self.history_path().is_file()
    }
}

/// Result of [`Archive::boot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOutcome {
    Created,
    AlreadyInitialized,
}

/// What an admission did with each input.
#[derive(Debug, Default)]
pub struct AdmitReport {
    /// Records appended, in processing order.
    pub admitted: Vec<Record>,
    /// Inputs no extractor produced metadata for.
    pub skipped: Vec<PathBuf>,
}

/// Tag changes to apply to every record matching a target.
///
/// When both are given the add is applied before the remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagRequest {
    pub add: Option<TagAssignment>,
    pub remove: Option<String>,
}

impl TagRequest {
    pub fn is_empty(&self) -> bool {
        self.add.is_none() && self.remove.is_none()
    }

    /// Reject requests that would touch `entry_id`, before anything is
    /// mutated.
    fn validate(&self) -> Result<()> {
        let keys = self.add.iter().map(|t| t.key.as_str()).chain(self.remove.as_deref());
        for key in keys {
            if key.is_empty() {
                return Err(ArchiveError::InvalidArgument("tag key must not be empty".into()));
            }
            if record::is_reserved(key) {
                return Err(ArchiveError::InvalidArgument(format!(
                    "{key:?} is the record identity and cannot be tagged"
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of [`Archive::tag`].
#[derive(Debug, Default)]
pub struct TagReport {
    /// Records selected by the target.
    pub matched: usize,
    /// History lines written, one per effective change.
    pub events: Vec<AuditEvent>,
}

/// Handle to an initialized archive.
pub struct Archive {
    layout: ArchiveLayout,
    store: ContentStore,
    audit: AuditLog,
    extractors: ExtractorRegistry,
}

impl Archive {
    /// Create the archive layout under `root` unless it already exists.
    pub fn boot(root: impl Into<PathBuf>) -> Result<BootOutcome> {
        let layout = ArchiveLayout::new(root);
        if layout.root().exists() {
            info!(root = %layout.root().display(), "Archive already initialized");
            return Ok(BootOutcome::AlreadyInitialized);
        }

        let objects = layout.objects_dir();
        std::fs::create_dir_all(&objects).map_err(ArchiveError::io(&objects))?;
        ArchiveConfig::default().save(&layout.config_path())?;
        Index::create(layout.index_path())?;
        AuditLog::create(layout.history_path())?;

        info!(root = %layout.root().display(), "Archive created");
        Ok(BootOutcome::Created)
    }

    /// Open an existing archive with the default extractors.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let layout = ArchiveLayout::new(root);
        if !layout.is_initialized() {
            return Err(ArchiveError::NotInitialized {
                root: layout.root().to_path_buf(),
            });
        }
        debug!(root = %layout.root().display(), "Archive opened");
        Ok(Self {
            store: ContentStore::new(layout.objects_dir()),
            audit: AuditLog::new(layout.history_path()),
            extractors: ExtractorRegistry::default(),
            layout,
        })
    }

    /// Replace the extractor registry used for admission.
    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Load a fresh snapshot of the index.
    pub fn index(&self) -> Result<Index> {
        Index::load(self.layout.index_path())
    }

    // ── Configuration ───────────────────────────────────────────────

    pub fn config(&self) -> Result<ArchiveConfig> {
        Ok(ArchiveConfig::load(&self.layout.config_path())?)
    }

    pub fn save_config(&self, config: &ArchiveConfig) -> Result<()> {
        config.save(&self.layout.config_path())?;
        info!("Archive config saved");
        Ok(())
    }

    // ── Admission ───────────────────────────────────────────────────

    /// Admit a single file, or every regular file directly inside a
    /// directory (non-recursive, in name order).
    ///
    /// Inputs no extractor accepts are skipped silently. I/O and parse
    /// failures abort the batch; files admitted before the failure stay
    /// admitted.
    pub fn admit(&self, path: &Path) -> Result<AdmitReport> {
        let inputs = collect_inputs(path)?;
        let mut index = self.index()?;
        let mut report = AdmitReport::default();

        for input in inputs {
            match self.admit_one(&mut index, &input)? {
                Some(record) => report.admitted.push(record),
                None => report.skipped.push(input),
            }
        }

        info!(
            admitted = report.admitted.len(),
            skipped = report.skipped.len(),
            "Admission finished"
        );
        Ok(report)
    }

    /// Admit one input into `index`: store the blob, append the record,
    /// then record the history line.
    ///
    /// The input is read once; extraction and fingerprinting both see the
    /// same bytes.
    fn admit_one(&self, index: &mut Index, path: &Path) -> Result<Option<Record>> {
        let Some(extractor) = self.extractors.for_path(path) else {
            debug!(path = %path.display(), "No extractor for input, skipping");
            return Ok(None);
        };

        let bytes = std::fs::read(path).map_err(ArchiveError::io(path))?;
        let Some(extracted) = extractor.extract(path, &bytes)? else {
            return Ok(None);
        };
        let kind = extracted.kind();

        let entry_id = self.store.put(&bytes)?;
        let record = Record::new(entry_id, extracted);

        index.append(record.clone())?;
        self.audit.record(AuditAction::AddFile, record.entry_id(), None)?;

        info!(
            entry_id = %record.entry_id(),
            extractor = %kind,
            path = %path.display(),
            "File admitted"
        );
        Ok(Some(record))
    }

    // ── Tagging ─────────────────────────────────────────────────────

    /// Apply `request` to every record whose `entry_id` or `filename`
    /// equals `target`.
    ///
    /// NOTE: because both fields are compared, a file name that happens to
    /// equal another record's `entry_id`, or a name shared by several
    /// records, mutates all of them.
    pub fn tag(&self, target: &str, request: &TagRequest) -> Result<TagReport> {
        request.validate()?;
        if request.is_empty() {
            warn!(tag_target = target, "Tag request has nothing to add or remove");
        }

        let mut index = self.index()?;
        let mut pending: Vec<(AuditAction, Fingerprint, String)> = Vec::new();

        let matched = index.update_in_place(target, |record| {
            if let Some(add) = &request.add {
                record.set_field(&add.key, add.value.clone())?;
                pending.push((AuditAction::Tag, record.entry_id().clone(), add.to_string()));
            }
            if let Some(key) = &request.remove
                && record.remove_field(key)?.is_some()
            {
                pending.push((AuditAction::RemoveTag, record.entry_id().clone(), key.clone()));
            }
            Ok(())
        })?;

        let mut report = TagReport {
            matched,
            events: Vec::with_capacity(pending.len()),
        };
        for (action, entry_id, detail) in pending {
            report.events.push(self.audit.record(action, &entry_id, Some(detail))?);
        }

        info!(tag_target = target, matched, changes = report.events.len(), "Tags updated");
        Ok(report)
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Records matching `query`, in insertion order.
    pub fn find(&self, query: &Query) -> Result<Vec<Record>> {
        let index = self.index()?;
        Ok(QueryEngine::new(&index).find(query).cloned().collect())
    }

    pub fn stats(&self) -> Result<Stats> {
        let index = self.index()?;
        Ok(QueryEngine::new(&index).stats())
    }

    /// The last `limit` history lines, or all of them.
    pub fn history(&self, limit: Option<usize>) -> Result<Vec<String>> {
        self.audit.tail(limit)
    }
}

/// Expand an admission path into the files to consider.
fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(path).map_err(ArchiveError::io(path))?;
    if !metadata.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(path).map_err(ArchiveError::io(path))? {
        let entry = entry.map_err(ArchiveError::io(path))?;
        let child = entry.path();
        if child.is_file() {
            inputs.push(child);
        }
    }
    inputs.sort();
    Ok(inputs)
}
