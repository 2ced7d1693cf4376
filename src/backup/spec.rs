//! Backup specifications
//!
//! Users address backups with a short string:
//!
//! | Spec                  | Meaning                                     |
//! |-----------------------|---------------------------------------------|
//! | `latest`              | newest backup                               |
//! | `N`                   | N-th newest backup, 1-based                 |
//! | `YYYY_MM_DD`          | newest backup taken on that day             |
//! | `YYYY_MM_DD-hh:mm:ss` | the backup taken at exactly that second     |

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use super::id::BackupId;
use crate::error::{VaultError, VaultResult};

/// A parsed backup specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupSpec {
    /// Newest backup
    Latest,
    /// N-th newest backup (1 = newest). Kept signed so `0` and negatives parse
    /// and are reported as out of range rather than malformed.
    Ordinal(i64),
    /// Newest backup on a calendar day
    Date(NaiveDate),
    /// Backup at an exact second
    DateTime(NaiveDateTime),
}

impl FromStr for BackupSpec {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || VaultError::InvalidBackupSpec(s.to_string());

        if s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }

        if let Ok(n) = s.parse::<i64>() {
            return Ok(Self::Ordinal(n));
        }

        // Integers beyond i64 are still ordinals, just out of any range
        if let Some(overflow) = saturated_ordinal(s) {
            return Ok(Self::Ordinal(overflow));
        }

        if matches_shape(s, "dddd_dd_dd") {
            return NaiveDate::parse_from_str(s, "%Y_%m_%d")
                .map(Self::Date)
                .map_err(|_| invalid());
        }

        if matches_shape(s, "dddd_dd_dd-dd:dd:dd") {
            return NaiveDateTime::parse_from_str(s, "%Y_%m_%d-%H:%M:%S")
                .map(Self::DateTime)
                .map_err(|_| invalid());
        }

        Err(invalid())
    }
}

impl fmt::Display for BackupSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Ordinal(n) => write!(f, "{}", n),
            Self::Date(d) => write!(f, "{}", d.format("%Y_%m_%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y_%m_%d-%H:%M:%S")),
        }
    }
}

impl BackupSpec {
    /// Pick the backup this spec addresses
    ///
    /// `newest_first` must be sorted newest first, as returned by
    /// `BackupStore::list_backups`.
    pub fn select(&self, entry: &str, newest_first: &[BackupId]) -> VaultResult<BackupId> {
        match *self {
            Self::Latest => newest_first
                .first()
                .copied()
                .ok_or_else(|| VaultError::backup_not_found(entry, "no backups exist")),
            Self::Ordinal(n) => {
                let count = newest_first.len();
                if n <= 0 || n as u64 > count as u64 {
                    return Err(VaultError::backup_not_found(
                        entry,
                        format!("backup number {} out of range (1-{})", n, count),
                    ));
                }
                Ok(newest_first[(n - 1) as usize])
            }
            Self::Date(day) => newest_first
                .iter()
                .find(|id| id.date() == day)
                .copied()
                .ok_or_else(|| VaultError::AmbiguousOrMissingBackup {
                    entry: entry.to_string(),
                    spec: self.to_string(),
                }),
            Self::DateTime(at) => newest_first
                .iter()
                .find(|id| id.timestamp() == at)
                .copied()
                .ok_or_else(|| {
                    VaultError::backup_not_found(entry, format!("no backup taken at {}", self))
                }),
        }
    }
}

/// `d` matches an ASCII digit, every other pattern byte matches itself
fn matches_shape(s: &str, pattern: &str) -> bool {
    s.len() == pattern.len()
        && s.bytes().zip(pattern.bytes()).all(|(c, p)| match p {
            b'd' => c.is_ascii_digit(),
            _ => c == p,
        })
}

fn saturated_ordinal(s: &str) -> Option<i64> {
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(d: u32, h: u32, m: u32, s: u32, seq: u32) -> BackupId {
        let ts = NaiveDate::from_ymd_opt(2025, 2, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap();
        BackupId::new(ts, seq)
    }

    fn history() -> Vec<BackupId> {
        // newest first
        vec![
            id(8, 9, 0, 0, 0),
            id(7, 18, 45, 10, 0),
            id(7, 8, 15, 0, 1),
            id(7, 8, 15, 0, 0),
            id(6, 23, 59, 59, 0),
        ]
    }

    #[test]
    fn test_parse_latest() {
        assert_eq!("latest".parse::<BackupSpec>().unwrap(), BackupSpec::Latest);
        assert_eq!("LATEST".parse::<BackupSpec>().unwrap(), BackupSpec::Latest);
    }

    #[test]
    fn test_parse_ordinal() {
        assert_eq!("3".parse::<BackupSpec>().unwrap(), BackupSpec::Ordinal(3));
        assert_eq!("0".parse::<BackupSpec>().unwrap(), BackupSpec::Ordinal(0));
        assert_eq!("-2".parse::<BackupSpec>().unwrap(), BackupSpec::Ordinal(-2));
    }

    #[test]
    fn test_huge_ordinal_is_out_of_range() {
        assert_eq!(
            "99999999999999999999".parse::<BackupSpec>().unwrap(),
            BackupSpec::Ordinal(i64::MAX)
        );
        assert_eq!(
            "-99999999999999999999".parse::<BackupSpec>().unwrap(),
            BackupSpec::Ordinal(i64::MIN)
        );

        let err = "99999999999999999999"
            .parse::<BackupSpec>()
            .unwrap()
            .select("notes", &history())
            .unwrap_err();
        assert!(matches!(err, VaultError::BackupNotFound { .. }));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_parse_date_and_datetime() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 7).unwrap();
        assert_eq!(
            "2025_02_07".parse::<BackupSpec>().unwrap(),
            BackupSpec::Date(date)
        );
        assert_eq!(
            "2025_02_07-08:15:00".parse::<BackupSpec>().unwrap(),
            BackupSpec::DateTime(date.and_hms_opt(8, 15, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_invalid() {
        for bad in [
            "",
            "newest",
            "2025-02-07",
            "2025_2_7",
            "2025_13_01",
            "2025_02_30",
            "2025_02_07-25:00:00",
            "2025_02_07 08:15:00",
            "1.5",
        ] {
            let err = bad.parse::<BackupSpec>().unwrap_err();
            assert!(
                matches!(err, VaultError::InvalidBackupSpec(_)),
                "{:?} should be invalid",
                bad
            );
        }
    }

    #[test]
    fn test_latest_equals_first_ordinal() {
        let backups = history();
        let latest = BackupSpec::Latest.select("notes", &backups).unwrap();
        let first = BackupSpec::Ordinal(1).select("notes", &backups).unwrap();
        assert_eq!(latest, backups[0]);
        assert_eq!(latest, first);
    }

    #[test]
    fn test_ordinal_bounds() {
        let backups = history();
        for n in 1..=backups.len() as i64 {
            let picked = BackupSpec::Ordinal(n).select("notes", &backups).unwrap();
            assert_eq!(picked, backups[(n - 1) as usize]);
        }

        for n in [0, -1, backups.len() as i64 + 1] {
            let err = BackupSpec::Ordinal(n).select("notes", &backups).unwrap_err();
            assert!(matches!(err, VaultError::BackupNotFound { .. }));
        }
    }

    #[test]
    fn test_date_returns_newest_of_day() {
        let backups = history();
        let day = NaiveDate::from_ymd_opt(2025, 2, 7).unwrap();
        let picked = BackupSpec::Date(day).select("notes", &backups).unwrap();
        assert_eq!(picked, id(7, 18, 45, 10, 0));
    }

    #[test]
    fn test_date_without_match() {
        let day = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let err = BackupSpec::Date(day).select("notes", &history()).unwrap_err();
        assert!(matches!(err, VaultError::AmbiguousOrMissingBackup { .. }));
    }

    #[test]
    fn test_datetime_exact_prefers_highest_seq() {
        let at = NaiveDate::from_ymd_opt(2025, 2, 7)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        let picked = BackupSpec::DateTime(at).select("notes", &history()).unwrap();
        assert_eq!(picked, id(7, 8, 15, 0, 1));

        let missing = at + chrono::Duration::seconds(1);
        let err = BackupSpec::DateTime(missing)
            .select("notes", &history())
            .unwrap_err();
        assert!(matches!(err, VaultError::BackupNotFound { .. }));
    }

    #[test]
    fn test_latest_on_empty_history() {
        let err = BackupSpec::Latest.select("notes", &[]).unwrap_err();
        assert!(matches!(err, VaultError::BackupNotFound { .. }));
    }
}
