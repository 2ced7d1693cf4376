//! Listing display formatting
//!
//! Formats vaults, entries and backup histories as aligned columns.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::backup::BackupId;

/// Format registered vaults, marking the current one with `*`
pub fn format_vault_list(vaults: &BTreeMap<String, PathBuf>, current: Option<&str>) -> String {
    if vaults.is_empty() {
        return "No vaults found.".to_string();
    }

    let name_width = vaults.keys().map(|n| n.chars().count()).max().unwrap_or(4).max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "  {:<name_width$}  {}\n",
        "Name",
        "Path",
        name_width = name_width
    ));
    output.push_str(&format!(
        "  {:-<name_width$}  {:-<4}\n",
        "",
        "",
        name_width = name_width
    ));

    for (name, path) in vaults {
        let marker = if current == Some(name.as_str()) { '*' } else { ' ' };
        output.push_str(&format!(
            "{} {:<name_width$}  {}\n",
            marker,
            name,
            path.display(),
            name_width = name_width
        ));
    }

    output
}

/// Format entries with their backup counts
pub fn format_entry_list(entries: &BTreeMap<String, usize>) -> String {
    if entries.is_empty() {
        return "No entries found.".to_string();
    }

    let name_width = entries
        .keys()
        .map(|n| n.chars().count())
        .max()
        .unwrap_or(5)
        .max(5);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<name_width$}  {:>7}\n",
        "Entry",
        "Backups",
        name_width = name_width
    ));
    output.push_str(&format!(
        "{:-<name_width$}  {:->7}\n",
        "",
        "",
        name_width = name_width
    ));

    for (name, count) in entries {
        output.push_str(&format!(
            "{:<name_width$}  {:>7}\n",
            name,
            count,
            name_width = name_width
        ));
    }

    let total: usize = entries.values().sum();
    output.push_str(&format!(
        "\n{} entr{}, {} backup(s)\n",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        total
    ));

    output
}

/// Format an entry's backup history, newest first, numbered as ordinal specs
pub fn format_backup_list(entry: &str, backups: &[BackupId]) -> String {
    if backups.is_empty() {
        return format!("No backups found for '{}'.", entry);
    }

    let mut output = format!("Backups of '{}' (newest first)\n", entry);
    for (i, id) in backups.iter().enumerate() {
        let seq = if id.seq() > 0 {
            format!(" (#{})", id.seq())
        } else {
            String::new()
        };
        output.push_str(&format!(
            "  {:>3}. {}{}\n",
            i + 1,
            id.timestamp().format("%Y_%m_%d-%H:%M:%S"),
            seq
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_empty_lists() {
        assert_eq!(format_vault_list(&BTreeMap::new(), None), "No vaults found.");
        assert_eq!(format_entry_list(&BTreeMap::new()), "No entries found.");
        assert_eq!(
            format_backup_list("notes", &[]),
            "No backups found for 'notes'."
        );
    }

    #[test]
    fn test_vault_list_marks_current() {
        let mut vaults = BTreeMap::new();
        vaults.insert("work".to_string(), PathBuf::from("/tmp/work"));
        vaults.insert("home".to_string(), PathBuf::from("/tmp/home"));

        let output = format_vault_list(&vaults, Some("work"));
        assert!(output.contains("* work  /tmp/work"));
        assert!(output.contains("  home  /tmp/home"));
    }

    #[test]
    fn test_entry_list_totals() {
        let mut entries = BTreeMap::new();
        entries.insert("notes".to_string(), 3);
        entries.insert("todo".to_string(), 1);

        let output = format_entry_list(&entries);
        assert!(output.contains("notes"));
        assert!(output.contains("2 entries, 4 backup(s)"));
    }

    #[test]
    fn test_backup_list_uses_spec_format() {
        let ts = NaiveDate::from_ymd_opt(2025, 2, 7)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        let output = format_backup_list("notes", &[BackupId::new(ts, 1), BackupId::new(ts, 0)]);

        assert!(output.contains("  1. 2025_02_07-08:15:00 (#1)"));
        assert!(output.contains("  2. 2025_02_07-08:15:00\n"));
    }
}
