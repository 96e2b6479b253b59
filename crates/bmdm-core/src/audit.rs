//! Append-only activity history.
//!
//! Every mutating operation appends one line to `activity.hist`:
//!
//! ```text
//! 2024-01-01 09:30:00.000123 | ADD_FILE | <entry_id>
//! 2024-01-01 09:31:12.402210 | TAG | <entry_id> | priority=high
//! 2024-01-01 09:32:40.918001 | REMOVE_TAG | <entry_id> | priority
//! ```
//!
//! The log is never truncated, rewritten, or rotated, and it is independent
//! of the index: removing a tag does not erase the line that added it.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::store::Fingerprint;

/// Field separator within a history line.
const DELIMITER: &str = " | ";

/// Timestamp layout, local time with microseconds.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// The kind of mutation an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    AddFile,
    Tag,
    RemoveTag,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::AddFile => "ADD_FILE",
            AuditAction::Tag => "TAG",
            AuditAction::RemoveTag => "REMOVE_TAG",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ADD_FILE" => Ok(AuditAction::AddFile),
            "TAG" => Ok(AuditAction::Tag),
            "REMOVE_TAG" => Ok(AuditAction::RemoveTag),
            other => Err(ArchiveError::InvalidArgument(format!(
                "unknown audit action {other:?}"
            ))),
        }
    }
}

/// One line of the activity history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub timestamp: NaiveDateTime,
    pub action: AuditAction,
    pub entry_id: Fingerprint,
    pub detail: Option<String>,
}

impl AuditEvent {
    /// An event stamped with the current local time.
    pub fn now(action: AuditAction, entry_id: Fingerprint, detail: Option<String>) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            action,
            entry_id,
            detail,
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{DELIMITER}{}{DELIMITER}{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.action,
            self.entry_id
        )?;
        if let Some(detail) = &self.detail {
            write!(f, "{DELIMITER}{detail}")?;
        }
        Ok(())
    }
}

impl FromStr for AuditEvent {
    type Err = ArchiveError;

    fn from_str(line: &str) -> Result<Self> {
        let malformed =
            || ArchiveError::InvalidArgument(format!("malformed history line {line:?}"));
        // The detail is last and may itself contain the delimiter.
        let mut parts = line.splitn(4, DELIMITER);
        let timestamp = parts.next().ok_or_else(malformed)?;
        let action = parts.next().ok_or_else(malformed)?;
        let entry_id = parts.next().ok_or_else(malformed)?;
        let detail = parts.next().map(str::to_string);

        Ok(Self {
            timestamp: NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
                .map_err(|_| malformed())?,
            action: action.parse()?,
            entry_id: entry_id.parse()?,
            detail,
        })
    }
}

/// Handle to the on-disk activity history.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create the history file if it does not exist. Existing content is kept.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let log = Self::new(path);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log.path)
            .map_err(ArchiveError::io(&log.path))?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single line.
    pub fn append(&self, event: &AuditEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(ArchiveError::io(&self.path))?;
        writeln!(file, "{event}").map_err(ArchiveError::io(&self.path))?;
        debug!(action = %event.action, entry_id = %event.entry_id, "Audit event recorded");
        Ok(())
    }

    /// Stamp and append an event, returning it.
    pub fn record(
        &self,
        action: AuditAction,
        entry_id: &Fingerprint,
        detail: Option<String>,
    ) -> Result<AuditEvent> {
        let event = AuditEvent::now(action, entry_id.clone(), detail);
        self.append(&event)?;
        Ok(event)
    }

    /// The last `limit` lines in chronological order, or every line when
    /// `limit` is `None`.
    pub fn tail(&self, limit: Option<usize>) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(&self.path).map_err(ArchiveError::io(&self.path))?;
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        let skip = match limit {
            Some(n) => lines.len().saturating_sub(n),
            None => 0,
        };
        Ok(lines.into_iter().skip(skip).collect())
    }

    /// Like [`tail`](Self::tail), parsed into events.
    pub fn events(&self, limit: Option<usize>) -> Result<Vec<AuditEvent>> {
        self.tail(limit)?.iter().map(|line| line.parse()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32, micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_micro_opt(h, m, s, micro)
            .unwrap()
    }

    fn log_in(dir: &TempDir) -> AuditLog {
        AuditLog::create(dir.path().join("activity.hist")).unwrap()
    }

    #[test]
    fn test_line_format() {
        let id = Fingerprint::of(b"x");
        let add = AuditEvent {
            timestamp: at(9, 30, 0, 123),
            action: AuditAction::AddFile,
            entry_id: id.clone(),
            detail: None,
        };
        assert_eq!(add.to_string(), format!("2024-01-01 09:30:00.000123 | ADD_FILE | {id}"));

        let tag = AuditEvent {
            action: AuditAction::Tag,
            detail: Some("priority=high".into()),
            ..add
        };
        assert_eq!(
            tag.to_string(),
            format!("2024-01-01 09:30:00.000123 | TAG | {id} | priority=high")
        );
    }

    #[test]
    fn test_line_parses_back() {
        let event = AuditEvent {
            timestamp: at(23, 59, 59, 999_999),
            action: AuditAction::RemoveTag,
            entry_id: Fingerprint::of(b"y"),
            detail: Some("note | with delimiter".into()),
        };
        let parsed: AuditEvent = event.to_string().parse().unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("hello".parse::<AuditEvent>().is_err());
        assert!("2024-01-01 00:00:00.000000 | EXPLODE | abc".parse::<AuditEvent>().is_err());
    }

    #[test]
    fn test_create_keeps_existing_history() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        log.record(AuditAction::AddFile, &Fingerprint::of(b"1"), None).unwrap();
        let again = log_in(&dir);
        assert_eq!(again.tail(None).unwrap().len(), 1);
    }

    #[test]
    fn test_tail_returns_last_lines_in_order() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        for i in 0..5u8 {
            log.record(AuditAction::AddFile, &Fingerprint::of(&[i]), None).unwrap();
        }

        let all = log.tail(None).unwrap();
        assert_eq!(all.len(), 5);

        let last_two = log.tail(Some(2)).unwrap();
        assert_eq!(last_two, all[3..].to_vec());

        assert_eq!(log.tail(Some(50)).unwrap(), all);
        assert!(log.tail(Some(0)).unwrap().is_empty());
    }

    #[test]
    fn test_events_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);
        let id = Fingerprint::of(b"z");
        log.record(AuditAction::AddFile, &id, None).unwrap();
        log.record(AuditAction::Tag, &id, Some("k=v".into())).unwrap();

        let events = log.events(None).unwrap();
        let actions: Vec<AuditAction> = events.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::AddFile, AuditAction::Tag]);
        assert!(events[0].timestamp <= events[1].timestamp);
        assert_eq!(events[1].detail.as_deref(), Some("k=v"));
    }
}
