//! Interlock configuration stored under `.interlock/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::decision::WriteThresholds;
use crate::core::risk::RiskClassifier;
use crate::core::types::ExecutionMode;

/// Interlock configuration (TOML).
///
/// Intended to be edited by humans. Missing fields take the documented
/// defaults, and a missing file is the same as an empty one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InterlockConfig {
    /// `simulate` reports what would happen; `live` performs approved actions.
    pub execution_mode: ExecutionMode,

    /// Dangerous commands are blocked when fatigue is strictly above this (0-100).
    pub fatigue_threshold: u8,

    /// Removed-line count above which a rewrite is high impact.
    pub write_warn_threshold: usize,

    /// Removed-line count above which a rewrite is critical impact.
    pub write_block_threshold: usize,

    /// Hard wall-clock limit for live command execution.
    pub command_timeout_secs: u64,

    /// Captured stdout/stderr beyond this many bytes is discarded.
    pub output_limit_bytes: usize,

    /// Trailing window over which behavioral metrics are averaged.
    pub metrics_window_minutes: u32,

    /// POSTed a JSON event on every override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    pub patterns: PatternConfig,
    pub sources: SourceConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PatternConfig {
    /// Extra dangerous patterns, appended to the built-in set. Prefix with
    /// `re:` for a case-insensitive regular expression.
    pub deny: Vec<String>,
    /// Exceptions. Loaded and reported, but not consulted by the interlock.
    pub allow: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    /// JSON lines of `{"timestamp": ...}` written by the activity tracker.
    pub heartbeat_path: PathBuf,
    /// JSON lines of behavioral samples written by the activity tracker.
    pub metrics_path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            heartbeat_path: PathBuf::from(".interlock/heartbeat.jsonl"),
            metrics_path: PathBuf::from(".interlock/metrics.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuditConfig {
    pub log_path: PathBuf,
    pub review_dir: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(".interlock/audit.log"),
            review_dir: PathBuf::from(".interlock/review"),
        }
    }
}

impl Default for InterlockConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Simulate,
            fatigue_threshold: 70,
            write_warn_threshold: 30,
            write_block_threshold: 50,
            command_timeout_secs: 30,
            output_limit_bytes: 100_000,
            metrics_window_minutes: 10,
            webhook_url: None,
            patterns: PatternConfig::default(),
            sources: SourceConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl InterlockConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fatigue_threshold > 100 {
            return Err(anyhow!("fatigue_threshold must be within 0..=100"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.metrics_window_minutes == 0 {
            return Err(anyhow!("metrics_window_minutes must be > 0"));
        }
        if let Some(url) = &self.webhook_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(anyhow!("webhook_url must be an http(s) URL"));
        }
        self.risk_classifier().context("patterns.deny")?;
        Ok(())
    }

    /// Built-in dangerous patterns merged with `patterns.deny`.
    pub fn risk_classifier(&self) -> Result<RiskClassifier> {
        RiskClassifier::new(&self.patterns.deny)
    }

    pub fn write_thresholds(&self) -> WriteThresholds {
        WriteThresholds {
            warn_lines: self.write_warn_threshold,
            block_lines: self.write_block_threshold,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `InterlockConfig::default()`.
pub fn load_config(path: &Path) -> Result<InterlockConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = InterlockConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: InterlockConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    if cfg.write_block_threshold < cfg.write_warn_threshold {
        warn!(
            warn_threshold = cfg.write_warn_threshold,
            block_threshold = cfg.write_block_threshold,
            "write_block_threshold is below write_warn_threshold; the warn tier is unreachable at high fatigue"
        );
    }
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &InterlockConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
