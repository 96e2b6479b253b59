//! Index records and tag assignments.
//!
//! A [`Record`] is one admitted file. Its identity (`entry_id`) is fixed at
//! admission; everything else lives in an open, insertion-ordered field map
//! that holds the extracted metadata and any tags added later. On disk a
//! record is a single flat JSON object:
//!
//! ```json
//! {
//!   "patient_id": "P001",
//!   "study_date": "20240101",
//!   "modality": "CT",
//!   "filename": "scan1.txt",
//!   "entry_id": "9f86d081..."
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ArchiveError, Result};
use crate::extract::Extracted;
use crate::store::Fingerprint;

/// Field holding the content fingerprint.
pub const ENTRY_ID: &str = "entry_id";
/// Field holding the (extractor-defined) file name.
pub const FILENAME: &str = "filename";

pub const PATIENT_ID: &str = "patient_id";
pub const STUDY_DATE: &str = "study_date";
pub const MODALITY: &str = "modality";

/// One admitted file: identity plus an open map of metadata and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(flatten)]
    fields: Map<String, Value>,
    entry_id: Fingerprint,
}

impl Record {
    /// Build the record for freshly extracted metadata.
    ///
    /// A payload `entry_id` key is dropped; the computed fingerprint always
    /// wins. Every other key is kept as extracted.
    pub fn new(entry_id: Fingerprint, extracted: Extracted) -> Self {
        let mut fields = extracted.into_fields();
        fields.shift_remove(ENTRY_ID);
        Self { fields, entry_id }
    }

    pub fn entry_id(&self) -> &Fingerprint {
        &self.entry_id
    }

    /// The `filename` field, if present and a string.
    pub fn filename(&self) -> Option<&str> {
        self.get_str(FILENAME)
    }

    /// Metadata and tag fields, in insertion order. Excludes the identity.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// A field's value when it is a JSON string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Whether `key` currently holds exactly the string `value`.
    ///
    /// `entry_id` is addressable too, so `entry_id=<fp>` works as a filter.
    /// Missing keys and non-string values never match.
    pub fn field_equals(&self, key: &str, value: &str) -> bool {
        match key {
            ENTRY_ID => self.entry_id.as_str() == value,
            _ => self.get_str(key) == Some(value),
        }
    }

    /// Whether a tag target token names this record, by `entry_id` or by
    /// `filename`.
    ///
    /// NOTE: the two namespaces overlap. A token equal to one record's
    /// `entry_id` and another record's `filename` selects both.
    pub fn matches_target(&self, target: &str) -> bool {
        self.entry_id.as_str() == target || self.filename() == Some(target)
    }

    /// Set `key` to the string `value`, returning the previous value.
    ///
    /// Any key but `entry_id` may be overwritten, core metadata included.
    pub fn set_field(&mut self, key: &str, value: impl Into<String>) -> Result<Option<Value>> {
        ensure_mutable(key)?;
        Ok(self.fields.insert(key.to_string(), Value::String(value.into())))
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove_field(&mut self, key: &str) -> Result<Option<Value>> {
        ensure_mutable(key)?;
        Ok(self.fields.shift_remove(key))
    }
}

/// Whether `key` is the identity field that tags may not touch.
pub fn is_reserved(key: &str) -> bool {
    key == ENTRY_ID
}

fn ensure_mutable(key: &str) -> Result<()> {
    if is_reserved(key) {
        return Err(ArchiveError::InvalidArgument(format!(
            "field {key:?} is part of the record identity and cannot be changed"
        )));
    }
    Ok(())
}

/// A `key=value` pair, as given to `--add-tag` or `--tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAssignment {
    pub key: String,
    pub value: String,
}

impl TagAssignment {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl FromStr for TagAssignment {
    type Err = ArchiveError;

    /// Split on the first `=`; the value may itself contain `=`.
    fn from_str(s: &str) -> Result<Self> {
        let (key, value) = s.split_once('=').ok_or_else(|| {
            ArchiveError::InvalidArgument(format!("expected key=value, got {s:?}"))
        })?;
        if key.is_empty() {
            return Err(ArchiveError::InvalidArgument(format!(
                "tag key must not be empty in {s:?}"
            )));
        }
        Ok(Self::new(key, value))
    }
}

impl fmt::Display for TagAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
