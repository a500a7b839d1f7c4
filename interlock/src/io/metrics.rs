//! Reader for the behavioral metrics source.
//!
//! The activity tracker appends JSON lines of
//! `{"timestamp", "stress_level", "focus_level", "cognitive_load", "typing_speed"}`.
//! The interlock averages the samples inside a trailing window.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Deserialize)]
struct MetricsSample {
    timestamp: DateTime<Utc>,
    #[serde(default)]
    stress_level: f64,
    #[serde(default)]
    focus_level: f64,
    #[serde(default)]
    cognitive_load: f64,
    #[serde(default)]
    typing_speed: f64,
}

/// Behavioral summary averaged over the trailing window.
///
/// All-zero with `samples == 0` when no data is available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SessionMetrics {
    pub stress_level: f64,
    pub focus_level: f64,
    pub cognitive_load: f64,
    pub typing_speed: f64,
    pub samples: usize,
}

/// Average the samples recorded in `(now - window, now]`.
///
/// A missing file yields neutral metrics; malformed lines are skipped.
#[instrument(skip_all, fields(path = %path.display(), window_minutes = window.num_minutes()))]
pub fn load_session_metrics(
    path: &Path,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<SessionMetrics> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("metrics source missing");
            return Ok(SessionMetrics::default());
        }
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };

    let window_start = now - window;
    let mut samples = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<MetricsSample>(line) {
            Ok(sample) if sample.timestamp > window_start && sample.timestamp <= now => {
                samples.push(sample);
            }
            Ok(_) => {}
            Err(err) => warn!(line = index + 1, err = %err, "skipping malformed metrics sample"),
        }
    }

    let metrics = average(&samples);
    debug!(samples = metrics.samples, stress = metrics.stress_level, "metrics averaged");
    Ok(metrics)
}

fn average(samples: &[MetricsSample]) -> SessionMetrics {
    if samples.is_empty() {
        return SessionMetrics::default();
    }
    let count = samples.len() as f64;
    let mean = |pick: fn(&MetricsSample) -> f64| samples.iter().map(pick).sum::<f64>() / count;
    SessionMetrics {
        stress_level: mean(|s| s.stress_level).clamp(0.0, 1.0),
        focus_level: mean(|s| s.focus_level),
        cognitive_load: mean(|s| s.cognitive_load),
        typing_speed: mean(|s| s.typing_speed),
        samples: samples.len(),
    }
}
