//! Ordered guard chains for the command and file-write interlocks.
//!
//! Both chains are pure: they turn risk/impact, fatigue and override presence
//! into a verdict. Mapping a verdict onto side effects and execution mode is
//! done by [`crate::gate`].

use crate::core::types::ImpactReport;

/// Phrase the human must type before a caller may pass an override reason.
pub const OVERRIDE_PHRASE: &str = "I accept the risk";

/// Fatigue above which a high-impact write warns.
pub const WRITE_WARN_FATIGUE: u8 = 50;
/// Fatigue above which a high-impact write is blocked.
pub const WRITE_BLOCK_FATIGUE: u8 = 70;
/// Fatigue above which a critical-impact write is hard-blocked.
pub const WRITE_HARD_BLOCK_FATIGUE: u8 = 80;

/// Instruction returned with every block.
pub fn override_instruction() -> String {
    format!(
        "Blocked by the fatigue interlock. Do not retry on your own. Ask the human to type \
         exactly \"{OVERRIDE_PHRASE}\" and explain why this must happen now, then repeat the \
         call with `override_reason` set to their explanation."
    )
}

/// True when a non-blank override reason was supplied.
pub fn has_override(reason: Option<&str>) -> bool {
    reason.is_some_and(|reason| !reason.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandVerdict {
    /// Blocked, but an override reason lets it through.
    Override,
    Block,
    /// Dangerous, fatigue within threshold.
    Warn,
    Allow,
}

/// Decide a command proposal.
///
/// A command is blocked only when it is dangerous and fatigue is strictly
/// above `threshold`.
pub fn decide_command(
    dangerous: bool,
    fatigue_level: u8,
    threshold: u8,
    has_override: bool,
) -> CommandVerdict {
    let should_block = dangerous && fatigue_level > threshold;
    if should_block && has_override {
        CommandVerdict::Override
    } else if should_block {
        CommandVerdict::Block
    } else if dangerous {
        CommandVerdict::Warn
    } else {
        CommandVerdict::Allow
    }
}

/// Line-count thresholds for rewrite impact.
///
/// `block_lines >= warn_lines` is expected but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteThresholds {
    pub warn_lines: usize,
    pub block_lines: usize,
}

/// The independent severity axes of a write proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSignals {
    pub high_impact: bool,
    pub critical_impact: bool,
    pub warn: bool,
    pub block: bool,
    pub hard_block: bool,
}

impl WriteSignals {
    pub fn evaluate(impact: &ImpactReport, fatigue_level: u8, thresholds: WriteThresholds) -> Self {
        if impact.is_new_file {
            return Self::default();
        }
        let high_impact = impact.lines_removed > thresholds.warn_lines;
        let critical_impact = impact.lines_removed > thresholds.block_lines;
        Self {
            high_impact,
            critical_impact,
            warn: fatigue_level > WRITE_WARN_FATIGUE && high_impact,
            block: fatigue_level > WRITE_BLOCK_FATIGUE && high_impact,
            hard_block: fatigue_level > WRITE_HARD_BLOCK_FATIGUE && critical_impact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteVerdict {
    Override,
    HardBlock,
    Block,
    Warn,
    Allow,
}

/// Decide a write proposal. Earlier guards win.
pub fn decide_write(signals: &WriteSignals, has_override: bool) -> WriteVerdict {
    if has_override && (signals.block || signals.hard_block) {
        WriteVerdict::Override
    } else if signals.hard_block {
        WriteVerdict::HardBlock
    } else if signals.block {
        WriteVerdict::Block
    } else if signals.warn {
        WriteVerdict::Warn
    } else {
        WriteVerdict::Allow
    }
}
