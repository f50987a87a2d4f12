//! Core domain types for Vigil
//!
//! This crate defines the vocabulary shared by the whole pipeline:
//! - File events and their classification
//! - Risk scoring rules (pure, deterministic)
//! - Alerts and anomalies
//! - The in-process event bus used to fan notifications out

pub mod bus;
pub mod event;
pub mod score;

pub use bus::EventBus;
pub use event::{
    Alert, AlertRecord, Anomaly, AnomalyKind, DetectionWindow, EventRecord, EventType, FileEvent,
    FileEventMessage, RiskAlertMessage,
};
pub use score::{score, severity_for, ALERT_THRESHOLD};
