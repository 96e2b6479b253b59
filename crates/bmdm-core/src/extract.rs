//! Metadata extraction: turning an input path into record fields.
//!
//! Two strategies are selected by file extension:
//!
//! - **Pattern** (`.txt`): the file name itself is the metadata. It is split
//!   on `_` and the first four tokens map positionally to `patient_id`,
//!   `study_date`, `modality` and `filename`. Names with fewer than four
//!   tokens are not archivable and are skipped.
//! - **Structured** (`.json`): the file is a JSON object describing the
//!   item. Its keys become fields, with `filename` forced to the real
//!   basename.
//!
//! Anything else yields no record. Skips are `Ok(None)`, never errors.
//!
//! Extractors are handed the bytes the caller already read, so the metadata
//! and the fingerprint always describe the same content.

use std::fmt;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::record::{FILENAME, MODALITY, PATIENT_ID, STUDY_DATE};

/// Which extraction strategy handled an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractorKind {
    /// Metadata parsed from an underscore-delimited file name.
    Pattern,
    /// Metadata read from a JSON description document.
    Structured,
}

impl ExtractorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorKind::Pattern => "pattern",
            ExtractorKind::Structured => "structured",
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields recovered from an underscore-delimited file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternFields {
    pub patient_id: String,
    pub study_date: String,
    pub modality: String,
    /// Fourth token of the name, *not* necessarily the real basename.
    pub filename: String,
}

/// Output of an extractor, before the content fingerprint is attached.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Pattern(PatternFields),
    Structured(Map<String, Value>),
}

impl Extracted {
    /// Structured output: `payload` merged with the input's basename, the
    /// basename taking precedence over any `filename` key in the payload.
    pub fn structured(mut payload: Map<String, Value>, basename: &str) -> Self {
        payload.insert(FILENAME.to_string(), Value::String(basename.to_string()));
        Extracted::Structured(payload)
    }

    pub fn kind(&self) -> ExtractorKind {
        match self {
            Extracted::Pattern(_) => ExtractorKind::Pattern,
            Extracted::Structured(_) => ExtractorKind::Structured,
        }
    }

    /// Flatten into an ordered field map.
    pub fn into_fields(self) -> Map<String, Value> {
        match self {
            Extracted::Pattern(p) => {
                let mut fields = Map::new();
                fields.insert(PATIENT_ID.to_string(), Value::String(p.patient_id));
                fields.insert(STUDY_DATE.to_string(), Value::String(p.study_date));
                fields.insert(MODALITY.to_string(), Value::String(p.modality));
                fields.insert(FILENAME.to_string(), Value::String(p.filename));
                fields
            }
            Extracted::Structured(fields) => fields,
        }
    }
}

/// A metadata extraction strategy for one family of file extensions.
pub trait Extractor {
    fn kind(&self) -> ExtractorKind;

    /// Extensions (without the dot, case-sensitive) this extractor handles.
    fn extensions(&self) -> &[&str];

    /// Derive metadata for the input at `path` whose bytes are `contents`,
    /// or `Ok(None)` if the input should be skipped.
    fn extract(&self, path: &Path, contents: &[u8]) -> Result<Option<Extracted>>;
}

/// Extracts metadata from `<patient>_<date>_<modality>_<name>` file names.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternExtractor;

impl PatternExtractor {
    /// Parse a basename. Tokens past the fourth are ignored.
    pub fn parse_name(basename: &str) -> Option<PatternFields> {
        let mut tokens = basename.split('_');
        let patient_id = tokens.next()?;
        let study_date = tokens.next()?;
        let modality = tokens.next()?;
        let filename = tokens.next()?;
        Some(PatternFields {
            patient_id: patient_id.to_string(),
            study_date: study_date.to_string(),
            modality: modality.to_string(),
            filename: filename.to_string(),
        })
    }
}

impl Extractor for PatternExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Pattern
    }

    fn extensions(&self) -> &[&str] {
        &["txt"]
    }

    fn extract(&self, path: &Path, _contents: &[u8]) -> Result<Option<Extracted>> {
        let Some(basename) = basename(path) else {
            return Ok(None);
        };
        match Self::parse_name(basename) {
            Some(fields) => Ok(Some(Extracted::Pattern(fields))),
            None => {
                debug!(path = %path.display(), "Name has fewer than four tokens, skipping");
                Ok(None)
            }
        }
    }
}

/// Extracts metadata from a JSON description document.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredExtractor;

impl Extractor for StructuredExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Structured
    }

    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn extract(&self, path: &Path, contents: &[u8]) -> Result<Option<Extracted>> {
        let Some(basename) = basename(path) else {
            return Ok(None);
        };
        let payload: Map<String, Value> =
            serde_json::from_slice(contents).map_err(ArchiveError::parse(path))?;
        Ok(Some(Extracted::structured(payload, basename)))
    }
}

/// Dispatches inputs to the extractor registered for their extension.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Create a registry with no extractors; every input is skipped.
    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Register an extractor. Earlier registrations win on extension clashes.
    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.push(extractor);
    }

    /// The extractor responsible for `path`, if any.
    pub fn for_path(&self, path: &Path) -> Option<&dyn Extractor> {
        let ext = path.extension()?.to_str()?;
        self.extractors
            .iter()
            .find(|e| e.extensions().contains(&ext))
            .map(|e| e.as_ref())
    }

}

impl Default for ExtractorRegistry {
    /// The standard pattern (`.txt`) and structured (`.json`) extractors.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PatternExtractor));
        registry.register(Box::new(StructuredExtractor));
        registry
    }
}

fn basename(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
