#![deny(unsafe_code)]

//! bmdm core: admission, indexing, tagging, and query engine.
//!
//! An archive turns arbitrary input files into durable, addressable,
//! searchable records:
//!
//! ```text
//!  input file ──▶ ExtractorRegistry ──▶ ContentStore ──▶ Index ──▶ AuditLog
//!                 (name / JSON → fields)  (sha256 → blob)  (append)  (ADD_FILE)
//! ```
//!
//! Tagging mutates records in the [`Index`] and appends to the [`AuditLog`];
//! queries read the index through the [`QueryEngine`]. The [`Archive`]
//! type bundles all of these over one on-disk directory.
//!
//! Everything is synchronous and assumes a single writer per archive.

/// The archive repository and its on-disk layout.
pub mod archive;
/// Append-only activity history.
pub mod audit;
/// Error taxonomy.
pub mod error;
/// Extension-dispatched metadata extractors.
pub mod extract;
/// The ordered, whole-file record index.
pub mod index;
/// Conjunctive filters and summary statistics.
pub mod query;
/// Records and tag assignments.
pub mod record;
/// Content-addressed blob storage.
pub mod store;

pub use archive::{AdmitReport, Archive, ArchiveLayout, BootOutcome, TagReport, TagRequest};
pub use audit::{AuditAction, AuditEvent, AuditLog};
pub use error::{ArchiveError, Result};
pub use extract::{
    Extracted, Extractor, ExtractorKind, ExtractorRegistry, PatternExtractor, StructuredExtractor,
};
pub use index::Index;
pub use query::{Query, QueryEngine, Stats};
pub use record::{Record, TagAssignment};
pub use store::{ContentStore, Fingerprint};
