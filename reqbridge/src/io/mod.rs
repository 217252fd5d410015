//! Host capabilities and side-effecting adapters.

pub mod config;
pub mod encoding;
pub mod file_access;
pub mod host;
pub mod local_fs;
pub mod process;
