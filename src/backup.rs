//! Backups of the rules, categories and groups files, taken before they are overwritten.

use crate::{utils, Config, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Manages backup file creation and rotation.
///
/// The `Backup` struct is immutable and owns copies of the paths and settings it needs.
/// Create a new instance via `Config::backup()` or `Backup::new()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
}

impl Backup {
    /// Creates a new `Backup` instance from a `Config`.
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
        }
    }

    /// Copies `file` into the backups directory, if it exists.
    ///
    /// The filename format is `{name}.YYYY-MM-DD-NNN` where `name` is the file name of `file` and
    /// NNN is a per-day sequence number. Automatically rotates old backups, keeping only
    /// `backup_copies` files per name.
    ///
    /// Returns the path to the created backup file, or `None` when there was nothing to back up.
    pub fn copy_file(&self, file: &Path) -> Result<Option<PathBuf>> {
        if !file.is_file() {
            return Ok(None);
        }
        let prefix = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let date = today();
        let seq = self.next_sequence_number(&prefix, &date)?;
        let path = self.backups_dir.join(format!("{prefix}.{date}-{seq:03}"));

        utils::copy(file, &path)?;
        debug!("Backed up {} to {}", file.display(), path.display());

        self.rotate(&prefix)?;

        Ok(Some(path))
    }

    /// Scans the backups directory for existing files with the given prefix and date,
    /// and returns the next sequence number.
    fn next_sequence_number(&self, prefix: &str, date: &str) -> Result<u32> {
        let max_seq = utils::read_dir(&self.backups_dir)?
            .iter()
            .filter_map(|(_, name)| parse_sequence_number(name, prefix, date))
            .max()
            .unwrap_or(0);
        Ok(max_seq + 1)
    }

    /// Rotates old backup files, keeping only `backup_copies` files with the given prefix.
    fn rotate(&self, prefix: &str) -> Result<()> {
        let mut files: Vec<(PathBuf, String)> = utils::read_dir(&self.backups_dir)?
            .into_iter()
            .filter(|(_, name)| is_backup_file(name, prefix))
            .collect();

        // Sort by filename (which sorts by date and sequence number due to format)
        files.sort_by(|a, b| a.1.cmp(&b.1));

        // Delete oldest files if we have more than backup_copies
        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for (path, _) in files.into_iter().take(to_delete) {
            utils::remove(&path)?;
        }

        Ok(())
    }
}

/// Returns today's date in YYYY-MM-DD format.
fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses the sequence number from a backup filename.
/// Returns None if the filename doesn't match the expected pattern.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    // Pattern: {prefix}.{date}-{NNN}
    let seq_str = filename.strip_prefix(&format!("{prefix}.{date}-"))?;
    if seq_str.is_empty() || !seq_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    seq_str.parse().ok()
}

/// Checks if a filename is a backup of the file named `prefix`.
fn is_backup_file(filename: &str, prefix: &str) -> bool {
    let Some(stamp) = filename.strip_prefix(&format!("{prefix}.")) else {
        return false;
    };
    // YYYY-MM-DD-NNN
    match stamp.get(..10).zip(stamp.get(10..)) {
        Some((date, seq)) => {
            chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
                && seq.len() > 1
                && seq.starts_with('-')
                && seq[1..].bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number("rules.json.2025-12-14-001", "rules.json", "2025-12-14"),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number("rules.json.2025-12-14-042", "rules.json", "2025-12-14"),
            Some(42)
        );
        // Wrong prefix
        assert_eq!(
            parse_sequence_number("groups.txt.2025-12-14-001", "rules.json", "2025-12-14"),
            None
        );
        // Wrong date
        assert_eq!(
            parse_sequence_number("rules.json.2025-12-13-001", "rules.json", "2025-12-14"),
            None
        );
        assert_eq!(
            parse_sequence_number("rules.json.2025-12-14-001.tmp", "rules.json", "2025-12-14"),
            None
        );
    }

    #[test]
    fn test_is_backup_file() {
        assert!(is_backup_file("rules.json.2025-12-14-001", "rules.json"));
        assert!(is_backup_file("categories.txt.2025-01-02-12", "categories.txt"));
        assert!(!is_backup_file("rules.json.2025-12-14-001", "groups.txt"));
        assert!(!is_backup_file("rules.json", "rules.json"));
        assert!(!is_backup_file("rules.json.tmp", "rules.json"));
        assert!(!is_backup_file("rules.json.2025-12-14-", "rules.json"));
    }

    #[test]
    fn test_copy_file_rotates() {
        let env = TestEnv::new();
        let config = env.config();
        let backup = config.backup();
        let rules = config.rules_path();

        for _ in 0..7 {
            assert!(backup.copy_file(&rules).unwrap().is_some());
        }
        let names: Vec<String> = utils::read_dir(config.backups())
            .unwrap()
            .into_iter()
            .map(|(_, name)| name)
            .filter(|name| name.starts_with("rules.json."))
            .collect();
        assert_eq!(names.len(), 5);
        // The two oldest are gone.
        assert!(!names.iter().any(|n| n.ends_with("-001") || n.ends_with("-002")));

        assert_eq!(
            backup.copy_file(&config.root().join("missing.txt")).unwrap(),
            None
        );
    }
}
