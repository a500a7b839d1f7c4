//! Request-scoped context: configuration, behavioral data and fatigue.
//!
//! Built fresh for every tool call and passed explicitly into the gate, so no
//! decision depends on ambient state.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::core::fatigue::{estimate, uptime_since_last_break};
use crate::core::risk::RiskClassifier;
use crate::core::types::{ExecutionMode, FatigueReading};
use crate::io::config::{InterlockConfig, load_config};
use crate::io::heartbeat::load_heartbeats;
use crate::io::metrics::{SessionMetrics, load_session_metrics};
use crate::io::paths::InterlockPaths;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub config: InterlockConfig,
    pub classifier: RiskClassifier,
    pub metrics: SessionMetrics,
    pub fatigue: FatigueReading,
    pub now: DateTime<Utc>,
}

impl RequestContext {
    /// Load config and behavioral data for one request.
    ///
    /// Configuration errors propagate. Unreadable behavioral sources degrade to
    /// neutral values.
    #[instrument(skip_all, fields(root = %paths.root.display()))]
    pub fn load(paths: &InterlockPaths, now: DateTime<Utc>) -> Result<Self> {
        let config = load_config(&paths.config_path)?;
        let metrics = read_metrics(paths, &config, now);
        let fatigue = read_fatigue(paths, &config, &metrics, now);
        debug!(
            level = fatigue.level,
            category = ?fatigue.category,
            uptime_hours = fatigue.uptime_hours,
            "fatigue estimated"
        );
        Self::from_parts(config, metrics, fatigue, now)
    }

    /// Assemble a context from already-known parts.
    pub fn from_parts(
        config: InterlockConfig,
        metrics: SessionMetrics,
        fatigue: FatigueReading,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let classifier = config.risk_classifier()?;
        Ok(Self {
            config,
            classifier,
            metrics,
            fatigue,
            now,
        })
    }
}

fn read_metrics(
    paths: &InterlockPaths,
    config: &InterlockConfig,
    now: DateTime<Utc>,
) -> SessionMetrics {
    let path = paths.resolve(&config.sources.metrics_path);
    let window = Duration::minutes(i64::from(config.metrics_window_minutes));
    match load_session_metrics(&path, window, now) {
        Ok(metrics) => metrics,
        Err(err) => {
            warn!(err = %format!("{err:#}"), "metrics source unavailable, using neutral values");
            SessionMetrics::default()
        }
    }
}

fn read_fatigue(
    paths: &InterlockPaths,
    config: &InterlockConfig,
    metrics: &SessionMetrics,
    now: DateTime<Utc>,
) -> FatigueReading {
    let path = paths.resolve(&config.sources.heartbeat_path);
    match load_heartbeats(&path) {
        Ok(heartbeats) => {
            let uptime = uptime_since_last_break(&heartbeats, now);
            estimate(metrics.stress_level, uptime)
        }
        Err(err) => {
            warn!(err = %format!("{err:#}"), "heartbeat source unavailable, assuming no fatigue");
            FatigueReading::neutral()
        }
    }
}

/// Snapshot returned by the state query.
#[derive(Debug, Clone, Serialize)]
pub struct StateReport {
    pub metrics: SessionMetrics,
    pub fatigue: FatigueReading,
    pub execution_mode: ExecutionMode,
    pub fatigue_threshold: u8,
    pub write_warn_threshold: usize,
    pub write_block_threshold: usize,
    pub dangerous_pattern_count: usize,
    /// Configured exceptions; reported only, never consulted.
    pub allow_patterns: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl StateReport {
    pub fn from_context(ctx: &RequestContext) -> Self {
        Self {
            metrics: ctx.metrics,
            fatigue: ctx.fatigue,
            execution_mode: ctx.config.execution_mode,
            fatigue_threshold: ctx.config.fatigue_threshold,
            write_warn_threshold: ctx.config.write_warn_threshold,
            write_block_threshold: ctx.config.write_block_threshold,
            dangerous_pattern_count: ctx.classifier.len(),
            allow_patterns: ctx.config.patterns.allow.clone(),
            timestamp: ctx.now,
        }
    }
}
