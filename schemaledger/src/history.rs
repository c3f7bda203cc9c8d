//! Read-only view of a schema file's git history.
//!
//! The snapshot directory is expected to be a git checkout; each commit made by
//! CI after a run is one version of the affected schemas.

use std::path::Path;
use std::process::Command;

use serde::Serialize;

use crate::errors::{Result, TrackerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// Abbreviated commit hash.
    pub commit: String,
    /// Committer date, ISO 8601.
    pub date: String,
}

/// Commits touching `path`, newest first, at most `limit` of them.
pub fn schema_history(repo_root: &Path, path: &Path, limit: usize) -> Result<Vec<HistoryEntry>> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .args(["log", "--format=%H|%cI"])
        .arg(format!("--max-count={limit}"))
        .arg("--")
        .arg(path)
        .output()
        .map_err(|err| TrackerError::Git {
            message: format!("failed to run git: {err}"),
        })?;

    if !output.status.success() {
        return Err(TrackerError::Git {
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(parse_log(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_log(raw: &str) -> Vec<HistoryEntry> {
    raw.lines()
        .filter_map(|line| line.split_once('|'))
        .map(|(hash, date)| HistoryEntry {
            commit: hash.chars().take(8).collect(),
            date: date.trim().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log() {
        let raw = "0123456789abcdef0123456789abcdef01234567|2024-05-01T10:00:00+00:00\n\
                   fedcba9876543210fedcba9876543210fedcba98|2024-04-01T09:30:00+02:00\n\n";
        let entries = parse_log(raw);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].commit, "01234567");
        assert_eq!(entries[0].date, "2024-05-01T10:00:00+00:00");
        assert_eq!(entries[1].commit, "fedcba98");
    }

    #[test]
    fn test_parse_log_skips_garbage() {
        assert!(parse_log("not a log line").is_empty());
    }
}
