//! Adaptation layer between a storage-agnostic HTTP request engine and an
//! editing host.
//!
//! The crate keeps the same split throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (locator resolution, path
//!   normalization, ordered registries, script candidate lookup). No I/O.
//! - **[`io`]**: Host capabilities and everything that touches storage or
//!   processes. Capabilities are traits so tests can swap in fakes.
//! - **[`engine`]**: The boundary the request engine sees: its ordered
//!   component pipeline, document store and script execution contract.
//!
//! Orchestration modules ([`watch`], [`controller`], [`bootstrap`],
//! [`activate`]) react to configuration changes by combining the three.

pub mod activate;
pub mod bootstrap;
pub mod controller;
pub mod core;
pub mod engine;
pub mod error;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod watch;
