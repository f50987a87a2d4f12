//! File event, alert, and anomaly types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Classified kind of filesystem activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// File created
    Create,
    /// File contents modified
    Modify,
    /// File deleted
    Delete,
    /// Directory created
    CreateDir,
    /// Directory deleted
    DeleteDir,
    /// Unrecognized notification kind
    Other,
}

impl EventType {
    /// Stable snake_case name, as stored and displayed
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Create => "create",
            EventType::Modify => "modify",
            EventType::Delete => "delete",
            EventType::CreateDir => "create_dir",
            EventType::DeleteDir => "delete_dir",
            EventType::Other => "other",
        }
    }

    /// All classifiable kinds, in display order
    pub fn all() -> &'static [EventType] {
        &[
            EventType::Create,
            EventType::Modify,
            EventType::Delete,
            EventType::CreateDir,
            EventType::DeleteDir,
            EventType::Other,
        ]
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(EventType::Create),
            "modify" => Ok(EventType::Modify),
            "delete" => Ok(EventType::Delete),
            "create_dir" => Ok(EventType::CreateDir),
            "delete_dir" => Ok(EventType::DeleteDir),
            "other" => Ok(EventType::Other),
            _ => Err(format!(
                "unknown event type '{s}' (expected create, modify, delete, create_dir, delete_dir or other)"
            )),
        }
    }
}

/// A single classified file event flowing through the pipeline
///
/// Built by the classifier with `risk_score` zero; the pipeline fills the
/// score in exactly once before the event is persisted or shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEvent {
    /// What happened
    pub event_type: EventType,
    /// Absolute path the notification referred to
    pub path: PathBuf,
    /// Final path segment
    pub name: String,
    /// Lowercased extension without the dot, empty when the name has none
    pub extension: String,
    /// Whether the path points at removable or external media
    pub is_external_drive: bool,
    /// Deterministic risk score in 0..=100
    pub risk_score: u8,
    /// User the daemon is monitoring on behalf of
    pub actor: String,
    /// When the event was observed
    pub created_at: DateTime<Utc>,
}

/// A persisted file event with its store-assigned id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: u64,
    pub event: FileEvent,
}

/// An alert raised for a single high-risk event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Stable machine-readable category, e.g. `high_risk_activity`
    pub alert_type: String,
    /// Human-readable one-liner
    pub description: String,
    /// Severity in 1..=5, derived from the risk score
    pub severity: u8,
    /// Score of the event that tripped the threshold
    pub risk_score: u8,
    /// Id of the persisted event this alert was raised for
    pub source_event_id: u64,
}

/// A persisted alert with its id and triage state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: u64,
    pub alert: Alert,
    /// Cleared by an operator via `resolve`
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// Category of detected anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Overall event volume far above baseline
    HighVolume,
    /// Deletion volume far above baseline
    HighDeletion,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::HighVolume => "high_volume",
            AnomalyKind::HighDeletion => "high_deletion",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The observation window an anomaly verdict was computed over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    /// How many events fell inside the window
    pub events_considered: usize,
}

/// A baseline-relative deviation found by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub description: String,
    /// Severity in 1..=5, fixed per anomaly kind
    pub severity: u8,
    pub window: DetectionWindow,
}

/// Notification payload published for every processed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEventMessage {
    pub id: u64,
    pub event_type: EventType,
    pub file_path: String,
    pub file_name: String,
    pub risk_score: u8,
    pub timestamp: DateTime<Utc>,
}

impl FileEventMessage {
    pub fn new(id: u64, event: &FileEvent) -> Self {
        Self {
            id,
            event_type: event.event_type,
            file_path: event.path.display().to_string(),
            file_name: event.name.clone(),
            risk_score: event.risk_score,
            timestamp: event.created_at,
        }
    }
}

/// Notification payload published when an alert is raised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlertMessage {
    pub alert_type: String,
    pub description: String,
    pub severity: u8,
    pub risk_score: u8,
    pub file_event_id: u64,
}

impl From<&Alert> for RiskAlertMessage {
    fn from(alert: &Alert) -> Self {
        Self {
            alert_type: alert.alert_type.clone(),
            description: alert.description.clone(),
            severity: alert.severity,
            risk_score: alert.risk_score,
            file_event_id: alert.source_event_id,
        }
    }
}
