//! Persistent activity log for Vigil
//!
//! This crate provides:
//! - Append-mostly event and alert storage (sled embedded DB)
//! - A time-ordered secondary index for windowed queries
//! - Aggregate statistics backing the CLI reporting surface

pub mod stats;
pub mod store;

// Re-exports
pub use stats::{EventStats, RiskBucket, RiskLevel, RiskSummary, TimelineBucket, TypeCount};
pub use store::{ActivityStore, EventFilter, RiskBand, SledStore};

/// Result type for store operations
pub type Result<T> = anyhow::Result<T>;
