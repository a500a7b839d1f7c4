//! Stable exit codes for interlock CLI commands.

use crate::core::types::Status;

/// Command succeeded, or the action was allowed/simulated/overridden.
pub const OK: i32 = 0;
/// Invalid config, arguments or other errors.
pub const INVALID: i32 = 1;
/// The interlock blocked the action.
pub const BLOCKED: i32 = 2;
/// The action was attempted and failed.
pub const FAILED: i32 = 3;

/// Exit code for an operation outcome.
pub fn for_status(status: Status) -> i32 {
    if status.is_blocked() {
        BLOCKED
    } else if status == Status::Failed {
        FAILED
    } else {
        OK
    }
}
