//! I/O adapters for the interlock: configuration, behavioral sources,
//! process and file primitives, audit sink and notifications.

pub mod audit;
pub mod config;
pub mod files;
pub mod heartbeat;
pub mod metrics;
pub mod notify;
pub mod paths;
pub mod process;
