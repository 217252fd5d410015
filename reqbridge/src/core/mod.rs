//! Deterministic, pure logic shared by the bridge.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod locator;
pub mod path;
pub mod registry;
pub mod script_path;
