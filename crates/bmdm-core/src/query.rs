//! Filtered lookup and summary statistics over the index.

use std::collections::BTreeSet;
use std::fmt;

use crate::index::Index;
use crate::record::{MODALITY, PATIENT_ID, Record, STUDY_DATE, TagAssignment};

/// A conjunction of equality filters. The empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub patient_id: Option<String>,
    pub modality: Option<String>,
    pub study_date: Option<String>,
    /// Arbitrary `key=value` filter, typically over a tag.
    pub tag: Option<TagAssignment>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patient_id(mut self, value: impl Into<String>) -> Self {
        self.patient_id = Some(value.into());
        self
    }

    pub fn modality(mut self, value: impl Into<String>) -> Self {
        self.modality = Some(value.into());
        self
    }

    pub fn study_date(mut self, value: impl Into<String>) -> Self {
        self.study_date = Some(value.into());
        self
    }

    pub fn tag(mut self, tag: TagAssignment) -> Self {
        self.tag = Some(tag);
        self
    }

    /// The active `(field, value)` clauses.
    pub fn clauses(&self) -> impl Iterator<Item = (&str, &str)> {
        [
            (PATIENT_ID, self.patient_id.as_deref()),
            (MODALITY, self.modality.as_deref()),
            (STUDY_DATE, self.study_date.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .chain(self.tag.iter().map(|t| (t.key.as_str(), t.value.as_str())))
    }

    pub fn is_empty(&self) -> bool {
        self.clauses().next().is_none()
    }

    /// Whether `record` satisfies every clause. A clause over a field the
    /// record lacks is unsatisfied.
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses().all(|(key, value)| record.field_equals(key, value))
    }
}

/// Aggregate view of the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    /// Distinct string `modality` values across all records.
    pub modalities: BTreeSet<String>,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modalities: Vec<&str> = self.modalities.iter().map(String::as_str).collect();
        writeln!(f, "Entries: {}", self.total)?;
        write!(f, "Modalities: {}", modalities.join(", "))
    }
}

/// Read-only query interface over an [`Index`] snapshot.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    index: &'a Index,
}

impl<'a> QueryEngine<'a> {
    pub fn new(index: &'a Index) -> Self {
        Self { index }
    }

    /// Records matching every clause of `query`, lazily, in insertion order.
    pub fn find(self, query: &'a Query) -> impl Iterator<Item = &'a Record> + 'a {
        self.index.find(move |r| query.matches(r))
    }

    pub fn stats(self) -> Stats {
        let records = self.index.records();
        Stats {
            total: records.len(),
            modalities: records
                .iter()
                .filter_map(|r| r.get_str(MODALITY))
                .map(str::to_string)
                .collect(),
        }
    }
}
