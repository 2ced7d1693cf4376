//! Backup identifiers and the on-disk naming scheme
//!
//! A backup of entry `notes` taken at 2025-02-07 14:30:22 local time is stored as
//! `notes_20250207-143022.bak`. A second backup within the same second gets a
//! sequence suffix: `notes_20250207-143022-1.bak`.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// Extension carried by every backup file
pub const BACKUP_EXTENSION: &str = "bak";

const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Identifies one backup of an entry
///
/// Ordering is chronological: by timestamp, then by collision sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackupId {
    timestamp: NaiveDateTime,
    seq: u32,
}

impl BackupId {
    /// Create an id, dropping any sub-second precision from `timestamp`
    pub fn new(timestamp: NaiveDateTime, seq: u32) -> Self {
        let timestamp = timestamp.with_nanosecond(0).unwrap_or(timestamp);
        Self { timestamp, seq }
    }

    /// Local timestamp at second precision
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Calendar day of the backup
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Collision sequence within the same second (0 for the first backup)
    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// File name of this backup for `entry`
    pub fn file_name(&self, entry: &str) -> String {
        format!("{}_{}.{}", entry, self, BACKUP_EXTENSION)
    }

    /// Parse a backup file name belonging to `entry`
    ///
    /// Returns `None` for the primary file, temp files and anything else that does
    /// not follow the naming scheme.
    pub fn parse_file_name(entry: &str, file_name: &str) -> Option<Self> {
        let stamp = file_name
            .strip_prefix(entry)?
            .strip_prefix('_')?
            .strip_suffix(BACKUP_EXTENSION)?
            .strip_suffix('.')?;
        stamp.parse().ok()
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.timestamp.format(STAMP_FORMAT))?;
        if self.seq > 0 {
            write!(f, "-{}", self.seq)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for BackupId {
    type Err = ();

    /// Parse `YYYYMMDD-HHMMSS` or `YYYYMMDD-HHMMSS-N`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stamp, seq) = match s.get(15..) {
            Some("") => (s, 0),
            Some(rest) => {
                let digits = rest.strip_prefix('-').ok_or(())?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(());
                }
                (&s[..15], digits.parse::<u32>().map_err(|_| ())?)
            }
            None => return Err(()),
        };

        let bytes = stamp.as_bytes();
        let shape_ok = bytes.len() == 15
            && bytes[8] == b'-'
            && bytes[..8].iter().all(u8::is_ascii_digit)
            && bytes[9..].iter().all(u8::is_ascii_digit);
        if !shape_ok {
            return Err(());
        }

        let timestamp = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).map_err(|_| ())?;
        Ok(Self::new(timestamp, seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_file_name_format() {
        let id = BackupId::new(ts(2025, 2, 7, 14, 30, 22), 0);
        assert_eq!(id.file_name("notes"), "notes_20250207-143022.bak");

        let id = BackupId::new(ts(2025, 2, 7, 14, 30, 22), 2);
        assert_eq!(id.file_name("notes"), "notes_20250207-143022-2.bak");
    }

    #[test]
    fn test_parse_file_name() {
        let id = BackupId::parse_file_name("notes", "notes_20250207-143022.bak").unwrap();
        assert_eq!(id.timestamp(), ts(2025, 2, 7, 14, 30, 22));
        assert_eq!(id.seq(), 0);

        let id = BackupId::parse_file_name("notes", "notes_20250207-143022-3.bak").unwrap();
        assert_eq!(id.seq(), 3);
    }

    #[test]
    fn test_parse_rejects_foreign_files() {
        assert!(BackupId::parse_file_name("notes", "notes").is_none());
        assert!(BackupId::parse_file_name("notes", ".notes.tmp").is_none());
        assert!(BackupId::parse_file_name("notes", "notes_20250207-143022.txt").is_none());
        assert!(BackupId::parse_file_name("notes", "notes_2025-02-07.bak").is_none());
        assert!(BackupId::parse_file_name("notes", "notes_20251307-143022.bak").is_none());
        assert!(BackupId::parse_file_name("notes", "notes_20250207-143022-.bak").is_none());
        assert!(BackupId::parse_file_name("note", "notes_20250207-143022.bak").is_none());
    }

    #[test]
    fn test_entry_name_with_underscore() {
        let id = BackupId::parse_file_name("my_notes", "my_notes_20250207-143022.bak").unwrap();
        assert_eq!(id.to_string(), "20250207-143022");
    }

    #[test]
    fn test_ordering_is_chronological() {
        let early = BackupId::new(ts(2025, 2, 7, 9, 0, 0), 0);
        let same_second = BackupId::new(ts(2025, 2, 7, 9, 0, 0), 1);
        let later = BackupId::new(ts(2025, 2, 7, 10, 0, 0), 0);

        assert!(early < same_second);
        assert!(same_second < later);
    }

    #[test]
    fn test_sub_second_precision_dropped() {
        let precise = ts(2025, 2, 7, 9, 0, 0) + chrono::Duration::milliseconds(750);
        let id = BackupId::new(precise, 0);
        assert_eq!(id.timestamp(), ts(2025, 2, 7, 9, 0, 0));
    }
}
