//! Vigil CLI and daemon
//!
//! The binary entry point lives in `main.rs`; everything else is
//! exposed here so integration tests can drive the pipeline and the
//! IPC surface directly.

pub mod cmd;
pub mod config;
pub mod daemon;
pub mod data_access;
pub mod ipc;
pub mod locks;
pub mod pipeline;
pub mod util;
