//! CLI command implementations

pub mod init;
pub mod start;
pub mod stop;
pub mod status;
pub mod events;
pub mod alerts;
pub mod anomalies;
pub mod baseline;
pub mod stats;
pub mod timeline;
pub mod config;
