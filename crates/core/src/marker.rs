//! Last-sync marker written to the input root after a completed run

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Marker file name. Never listed in either tree.
pub const LAST_SYNC_FILE: &str = "lastSync.txt";

/// Medium date-time format, e.g. `Oct 17, 2026, 3:04:05 PM`
pub const MARKER_TIME_FORMAT: &str = "%b %-d, %Y, %-I:%M:%S %p";

/// Path of the marker for a given input root
#[must_use]
pub fn marker_path(input_root: &Path) -> PathBuf {
    input_root.join(LAST_SYNC_FILE)
}

/// Replace the marker with one holding `at`
///
/// Any existing marker is removed first; a missing one is fine.
///
/// # Errors
/// Returns an error if the old marker cannot be removed or the new one
/// cannot be created.
pub fn record_completion(input_root: &Path, at: DateTime<Local>) -> io::Result<PathBuf> {
    let path = marker_path(input_root);

    match std::fs::remove_file(&path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    std::fs::write(&path, at.format(MARKER_TIME_FORMAT).to_string())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn completed_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 5, 15, 4, 5).unwrap()
    }

    #[test]
    fn test_record_completion_writes_marker() {
        let dir = TempDir::new().unwrap();

        let path = record_completion(dir.path(), completed_at()).unwrap();

        assert_eq!(path, dir.path().join(LAST_SYNC_FILE));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Jan 5, 2024, 3:04:05 PM"
        );
    }

    #[test]
    fn test_record_completion_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(LAST_SYNC_FILE),
            "a much longer previous marker content",
        )
        .unwrap();

        record_completion(dir.path(), completed_at()).unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join(LAST_SYNC_FILE)).unwrap(),
            "Jan 5, 2024, 3:04:05 PM"
        );
    }

    #[test]
    fn test_record_completion_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");

        assert!(record_completion(&missing, completed_at()).is_err());
    }
}
