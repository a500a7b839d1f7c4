//! Deterministic, pure logic shared by the interlock.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod decision;
pub mod fatigue;
pub mod impact;
pub mod risk;
pub mod types;
