//! Audit trail and review snapshots.
//!
//! The audit log is JSON lines appended for every block and override. Review
//! snapshots hold the content of blocked writes; they are written once and
//! never read back or deleted here.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::core::types::Status;

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action_description: String,
    pub override_reason: Option<String>,
    pub outcome: Status,
}

/// Destination for audit entries and review snapshots.
#[derive(Debug, Clone)]
pub struct AuditSink {
    log_path: PathBuf,
    review_dir: PathBuf,
}

impl AuditSink {
    pub fn new(log_path: impl Into<PathBuf>, review_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            review_dir: review_dir.into(),
        }
    }

    /// Append one entry to the audit log.
    #[instrument(skip_all, fields(path = %self.log_path.display(), outcome = ?entry.outcome))]
    pub fn append(&self, entry: &AuditEntry) -> Result<()> {
        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create audit dir {}", parent.display()))?;
        }
        let mut line = serde_json::to_string(entry).context("serialize audit entry")?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("open audit log {}", self.log_path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append audit log {}", self.log_path.display()))?;
        debug!("audit entry appended");
        Ok(())
    }

    /// Append an entry, logging instead of failing.
    pub fn record(&self, entry: &AuditEntry) {
        if let Err(err) = self.append(entry) {
            warn!(err = %format!("{err:#}"), "failed to write audit entry");
        }
    }

    /// Record an override. Best-effort.
    pub fn record_override(
        &self,
        action_description: &str,
        reason: &str,
        outcome: Status,
        now: DateTime<Utc>,
    ) {
        self.record(&AuditEntry {
            timestamp: now,
            action_description: action_description.to_string(),
            override_reason: Some(reason.to_string()),
            outcome,
        });
    }

    /// Record a block. Best-effort.
    pub fn record_block(&self, action_description: &str, outcome: Status, now: DateTime<Utc>) {
        self.record(&AuditEntry {
            timestamp: now,
            action_description: action_description.to_string(),
            override_reason: None,
            outcome,
        });
    }

    /// Read the audit log. A missing log has no entries.
    pub fn entries(&self) -> Result<Vec<AuditEntry>> {
        let contents = match fs::read_to_string(&self.log_path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("read {}", self.log_path.display()));
            }
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("parse audit entry"))
            .collect()
    }

    /// Save unapplied content for human review and return where it went.
    #[instrument(skip_all, fields(target = %target.display()))]
    pub fn snapshot_for_review(
        &self,
        target: &Path,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.review_dir)
            .with_context(|| format!("create review dir {}", self.review_dir.display()))?;
        let path = self.review_dir.join(snapshot_name(target, now));
        fs::write(&path, content)
            .with_context(|| format!("write review snapshot {}", path.display()))?;
        debug!(snapshot = %path.display(), "review snapshot saved");
        Ok(path)
    }
}

/// Longest sanitized path kept verbatim in a snapshot name.
const MAX_FLAT_PATH_LEN: usize = 160;
/// Trailing characters kept when a sanitized path is shortened.
const KEPT_TAIL_LEN: usize = 120;

/// `<UTC timestamp>_<sanitized target path>`.
///
/// Long paths keep their tail behind a short hash of the full sanitized path,
/// so the name stays well under the file-name limit.
pub fn snapshot_name(target: &Path, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}",
        now.format("%Y%m%dT%H%M%S%.3fZ"),
        shorten(sanitize_path(target))
    )
}

fn shorten(flat: String) -> String {
    if flat.len() <= MAX_FLAT_PATH_LEN {
        return flat;
    }
    // Sanitized names are ASCII, so byte offsets are char boundaries.
    let tail = flat[flat.len() - KEPT_TAIL_LEN..].trim_start_matches(['_', '.']);
    format!("{}_{}", path_hash(&flat), tail)
}

fn path_hash(flat: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(flat.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

/// Flatten a path into a single file name.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`; leading `_` and `.` are
/// stripped so the result is never hidden or empty.
pub fn sanitize_path(path: &Path) -> String {
    let flat: String = path
        .to_string_lossy()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = flat.trim_start_matches(['_', '.']);
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 14, 5, 9)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn sanitize_flattens_paths() {
        assert_eq!(sanitize_path(Path::new("/home/dev/src/main.rs")), "home_dev_src_main.rs");
        assert_eq!(sanitize_path(Path::new("../secret file.txt")), "secret_file.txt");
        assert_eq!(sanitize_path(Path::new("/")), "unnamed");
    }

    #[test]
    fn snapshot_name_starts_with_timestamp() {
        assert_eq!(
            snapshot_name(Path::new("src/lib.rs"), now()),
            "20260302T140509.000Z_src_lib.rs"
        );
    }

    #[test]
    fn long_paths_keep_tail_behind_hash() {
        let deep: PathBuf = (0..30)
            .map(|i| format!("segment{i:02}"))
            .chain(std::iter::once("file.rs".to_string()))
            .collect();
        let name = snapshot_name(&deep, now());
        assert!(name.len() < 200, "{} bytes", name.len());
        assert!(name.starts_with("20260302T140509.000Z_"));
        assert!(name.ends_with("segment29_file.rs"));

        let sibling = deep.with_file_name("other").join("file.rs");
        assert_ne!(snapshot_name(&sibling, now()), name);
    }

    #[test]
    fn appends_and_reads_entries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let sink = AuditSink::new(temp.path().join("logs/audit.log"), temp.path().join("review"));
        assert!(sink.entries().expect("entries").is_empty());

        sink.record_block("execute: rm -rf /", Status::Blocked, now());
        sink.record_override("execute: rm -rf /", "disk full", Status::SimulatedOverride, now());

        let entries = sink.entries().expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].override_reason, None);
        assert_eq!(entries[1].override_reason.as_deref(), Some("disk full"));
        assert_eq!(entries[1].outcome, Status::SimulatedOverride);
    }

    #[test]
    fn record_swallows_write_failures() {
        let temp = tempfile::tempdir().expect("tempdir");
        // The log path is a directory, so appending fails.
        let sink = AuditSink::new(temp.path(), temp.path().join("review"));
        sink.record_block("write: x", Status::Blocked, now());
        assert!(sink.append(&AuditEntry {
            timestamp: now(),
            action_description: "write: x".to_string(),
            override_reason: None,
            outcome: Status::Blocked,
        })
        .is_err());
    }

    #[test]
    fn snapshot_writes_content_under_review_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let sink = AuditSink::new(temp.path().join("audit.log"), temp.path().join("review"));
        let path = sink
            .snapshot_for_review(Path::new("/repo/src/main.rs"), "fn main() {}\n", now())
            .expect("snapshot");
        assert!(path.starts_with(temp.path().join("review")));
        assert!(path.ends_with("20260302T140509.000Z_repo_src_main.rs"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "fn main() {}\n");
    }
}
