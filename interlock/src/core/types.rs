//! Shared deterministic types for the interlock core.
//!
//! These types define stable contracts between the estimator, the classifiers
//! and the decision chains. They do not depend on external state or I/O.

use serde::{Deserialize, Serialize};

/// Whether approved actions are actually performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Report what would happen; never run commands or write files.
    #[default]
    Simulate,
    /// Perform approved actions.
    Live,
}

impl ExecutionMode {
    pub fn is_live(self) -> bool {
        self == ExecutionMode::Live
    }
}

/// Uptime band surfaced alongside the numeric fatigue level.
///
/// The band describes time since the last break only; stress does not move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatigueCategory {
    Low,
    Moderate,
    High,
    Critical,
}

/// Fatigue derived for a single request. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FatigueReading {
    /// Combined uptime + stress score in `0..=100`.
    pub level: u8,
    pub category: FatigueCategory,
    /// Hours worked since the last break of at least an hour.
    pub uptime_hours: f64,
}

impl FatigueReading {
    /// Reading used when the behavioral sources cannot be read.
    pub fn neutral() -> Self {
        Self {
            level: 0,
            category: FatigueCategory::Low,
            uptime_hours: 0.0,
        }
    }
}

/// Destructiveness of a proposed file rewrite.
///
/// Counts are over the sets of distinct, trimmed, non-blank lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub lines_removed: usize,
    pub lines_added: usize,
    pub total_old_lines: usize,
    pub total_new_lines: usize,
    pub percentage_removed: u32,
    pub is_new_file: bool,
}

/// Closed set of interlock outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Allowed,
    AllowedWithWarning,
    Simulated,
    SimulatedOverride,
    Blocked,
    BlockedAndSavedForReview,
    Executed,
    ExecutedOverride,
    WrittenOverride,
    Failed,
}

impl Status {
    /// True for outcomes where the action was stopped by the interlock.
    pub fn is_blocked(self) -> bool {
        matches!(self, Status::Blocked | Status::BlockedAndSavedForReview)
    }

    /// True for outcomes produced by an override.
    pub fn is_override(self) -> bool {
        matches!(
            self,
            Status::SimulatedOverride | Status::ExecutedOverride | Status::WrittenOverride
        )
    }
}
