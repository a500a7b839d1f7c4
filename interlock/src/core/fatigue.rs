//! Fatigue estimation from uptime and acute stress.

use chrono::{DateTime, Duration, Utc};

use crate::core::types::{FatigueCategory, FatigueReading};

/// A gap between heartbeats at least this long counts as a break.
pub const BREAK_GAP_MINUTES: i64 = 60;

/// Uptime contribution saturates at this many points (reached at 12h).
const UPTIME_CAP: f64 = 60.0;
/// Hours of uptime needed to saturate the uptime contribution.
const UPTIME_SATURATION_HOURS: f64 = 12.0;
/// Maximum contribution of acute stress.
const STRESS_WEIGHT: f64 = 40.0;

/// Hours worked since the most recent break.
///
/// Scans heartbeats from the most recent backward and stops at the first gap of
/// at least [`BREAK_GAP_MINUTES`]. Without such a gap, uptime spans from the
/// earliest heartbeat. No heartbeats means no uptime.
pub fn uptime_since_last_break(heartbeats: &[DateTime<Utc>], now: DateTime<Utc>) -> f64 {
    if heartbeats.is_empty() {
        return 0.0;
    }
    let mut sorted = heartbeats.to_vec();
    sorted.sort_unstable();

    let gap = Duration::minutes(BREAK_GAP_MINUTES);
    let start = sorted
        .windows(2)
        .rev()
        .find(|pair| pair[1] - pair[0] >= gap)
        .map(|pair| pair[1])
        .unwrap_or(sorted[0]);

    let elapsed = now - start;
    if elapsed <= Duration::zero() {
        return 0.0;
    }
    elapsed.num_milliseconds() as f64 / 3_600_000.0
}

/// Combined fatigue score in `0..=100`.
///
/// `min(60, uptime/12*60) + stress*40`, clamped and rounded to the nearest
/// integer. Stress is clamped to `0.0..=1.0` and non-finite inputs count as
/// zero.
///
/// Thresholds compare against the rounded level, so a raw score up to half a
/// point above a threshold (70.4 against `> 70`) does not exceed it.
pub fn fatigue_level(stress: f64, uptime_hours: f64) -> u8 {
    let stress = if stress.is_finite() {
        stress.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let uptime_hours = if uptime_hours.is_finite() {
        uptime_hours.max(0.0)
    } else {
        0.0
    };
    let from_uptime = (uptime_hours / UPTIME_SATURATION_HOURS * UPTIME_CAP).min(UPTIME_CAP);
    let raw = from_uptime + stress * STRESS_WEIGHT;
    raw.clamp(0.0, 100.0).round() as u8
}

/// Uptime band: <4h low, <8h moderate, <12h high, otherwise critical.
pub fn category_for_uptime(uptime_hours: f64) -> FatigueCategory {
    if uptime_hours < 4.0 {
        FatigueCategory::Low
    } else if uptime_hours < 8.0 {
        FatigueCategory::Moderate
    } else if uptime_hours < 12.0 {
        FatigueCategory::High
    } else {
        FatigueCategory::Critical
    }
}

/// Build a full reading from stress and uptime.
pub fn estimate(stress: f64, uptime_hours: f64) -> FatigueReading {
    let uptime_hours = if uptime_hours.is_finite() {
        uptime_hours.max(0.0)
    } else {
        0.0
    };
    FatigueReading {
        level: fatigue_level(stress, uptime_hours),
        category: category_for_uptime(uptime_hours),
        uptime_hours,
    }
}
