//! Reader for the activity tracker's heartbeat log.
//!
//! The log is JSON lines, one `{"timestamp": "<RFC 3339>"}` per line. It is
//! owned by an external process; the interlock only reads it.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct HeartbeatEvent {
    timestamp: DateTime<Utc>,
}

/// Load every heartbeat timestamp.
///
/// A missing file is an empty log. Any malformed line fails the whole read so
/// the caller can treat the source as unavailable.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_heartbeats(path: &Path) -> Result<Vec<DateTime<Utc>>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("heartbeat log missing");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    let heartbeats = parse_heartbeats(&contents)
        .with_context(|| format!("parse {}", path.display()))?;
    debug!(count = heartbeats.len(), "heartbeats loaded");
    Ok(heartbeats)
}

fn parse_heartbeats(contents: &str) -> Result<Vec<DateTime<Utc>>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<HeartbeatEvent>(line)
                .map(|event| event.timestamp)
                .with_context(|| format!("line {}", index + 1))
        })
        .collect()
}
