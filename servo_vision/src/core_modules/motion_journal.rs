// THEORY:
// The `MotionJournal` is the historical record of the run: one entry per cycle in
// which a target was tracked, holding the wall-clock time and the target's
// centroid. Entries live in memory for the whole run (append is O(1)) and are
// written out exactly once, at shutdown, as a comma-separated table:
//
//     Timestamp,CX,CY
//     2026-10-18 14:03:07,400,240
//
// The flush is all-or-nothing. Rows go to a temporary file next to the
// destination, which is then renamed over it, so a failed flush never leaves a
// half-written journal behind. A failure is returned to the caller; the
// in-memory entries are not retried or redirected elsewhere.

use crate::core_modules::blob::Point;
use crate::error::JournalFlushError;
use chrono::{Local, NaiveDateTime};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Column names of the journal file.
pub const JOURNAL_HEADER: [&str; 3] = ["Timestamp", "CX", "CY"];
/// Local date-time layout of the `Timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One tracked position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionLogEntry {
    pub timestamp: NaiveDateTime,
    pub cx: i32,
    pub cy: i32,
}

impl MotionLogEntry {
    pub fn new(timestamp: NaiveDateTime, centroid: Point) -> Self {
        Self {
            timestamp,
            cx: centroid.x,
            cy: centroid.y,
        }
    }

    /// An entry stamped with the current local time.
    pub fn now(centroid: Point) -> Self {
        Self::new(Local::now().naive_local(), centroid)
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Ordered, append-only log of tracked positions.
#[derive(Debug, Default)]
pub struct MotionJournal {
    entries: Vec<MotionLogEntry>,
}

impl MotionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. Timestamps never go backwards: an entry stamped
    /// earlier than the previous one (wall clock stepped back) takes the
    /// previous entry's timestamp.
    pub fn record(&mut self, mut entry: MotionLogEntry) {
        if let Some(last) = self.entries.last() {
            if entry.timestamp < last.timestamp {
                debug!("Clock stepped back, holding journal timestamp at {}", last.timestamp);
                entry.timestamp = last.timestamp;
            }
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[MotionLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the header and every entry as CSV rows into `writer`.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<W, JournalFlushError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);

        csv_writer.write_record(JOURNAL_HEADER)?;
        for entry in &self.entries {
            csv_writer.write_record([
                entry.formatted_timestamp(),
                entry.cx.to_string(),
                entry.cy.to_string(),
            ])?;
        }

        csv_writer
            .into_inner()
            .map_err(|err| JournalFlushError::Io(err.into_error()))
    }

    /// Replaces the file at `path` with the full journal, atomically.
    /// Returns the number of rows written.
    pub fn flush(&self, path: &Path) -> Result<usize, JournalFlushError> {
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let staging = NamedTempFile::new_in(directory)?;
        let mut staging = self.write_to(staging)?;
        staging.as_file_mut().sync_all()?;
        staging.persist(path)?;

        info!("Motion journal flushed: {} entries to {}", self.entries.len(), path.display());
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .expect("valid date-time")
    }

    #[test]
    fn rows_follow_the_header_in_record_order() {
        let mut journal = MotionJournal::new();
        journal.record(MotionLogEntry::new(at(14, 3, 7), Point { x: 400, y: 240 }));
        journal.record(MotionLogEntry::new(at(14, 3, 8), Point { x: 398, y: 251 }));

        let bytes = journal.write_to(Vec::new()).expect("write");
        let text = String::from_utf8(bytes).expect("utf8");
        assert_eq!(
            text,
            "Timestamp,CX,CY\n2026-10-18 14:03:07,400,240\n2026-10-18 14:03:08,398,251\n"
        );
    }

    #[test]
    fn empty_journal_is_just_the_header() {
        let journal = MotionJournal::new();
        let text = String::from_utf8(journal.write_to(Vec::new()).expect("write")).expect("utf8");
        assert_eq!(text, "Timestamp,CX,CY\n");
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let mut journal = MotionJournal::new();
        journal.record(MotionLogEntry::new(at(10, 0, 5), Point { x: 1, y: 1 }));
        journal.record(MotionLogEntry::new(at(10, 0, 2), Point { x: 2, y: 2 }));
        journal.record(MotionLogEntry::new(at(10, 0, 9), Point { x: 3, y: 3 }));

        let stamps: Vec<NaiveDateTime> = journal.entries().iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![at(10, 0, 5), at(10, 0, 5), at(10, 0, 9)]);
        assert_eq!(journal.entries()[1].cx, 2);
    }

    #[test]
    fn flush_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("motion_log.csv");
        std::fs::write(&path, "stale contents that must disappear\n").expect("seed file");

        let mut journal = MotionJournal::new();
        journal.record(MotionLogEntry::new(at(9, 30, 0), Point { x: 320, y: 240 }));
        let written = journal.flush(&path).expect("flush");

        assert_eq!(written, 1);
        let text = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(text, "Timestamp,CX,CY\n2026-10-18 09:30:00,320,240\n");
    }

    #[test]
    fn flush_into_missing_directory_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("no-such-dir").join("motion_log.csv");

        let mut journal = MotionJournal::new();
        journal.record(MotionLogEntry::new(at(9, 30, 0), Point { x: 320, y: 240 }));
        assert!(journal.flush(&path).is_err());
        assert!(!path.exists());
        assert_eq!(journal.len(), 1);
    }
}
