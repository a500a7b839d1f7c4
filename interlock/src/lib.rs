//! Fatigue interlock for AI coding agents.
//!
//! Sits between an agent and the shell/filesystem. Every proposed command or
//! file write is weighed against the developer's estimated fatigue; risky
//! actions are warned about or blocked until a human explicitly overrides.
//!
//! - **[`core`]**: Pure logic (fatigue estimate, risk classification, write
//!   impact, guard chains). No I/O.
//! - **[`io`]**: Config, behavioral sources, process execution, audit trail and
//!   notifications.
//!
//! [`gate`] combines the two for the four operations, [`server`] exposes them
//! as JSON-RPC tools over stdio.

pub mod context;
pub mod core;
pub mod exit_codes;
pub mod gate;
pub mod io;
pub mod logging;
pub mod outcome;
pub mod server;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
