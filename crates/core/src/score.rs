//! Deterministic risk scoring
//!
//! Scoring is a pure function of the event: same event, same score. The
//! rules are additive bonuses over a base score per event kind, clamped
//! to 0..=100. Nothing here touches the filesystem or the clock.

use crate::event::{EventType, FileEvent};

/// Events scoring strictly above this raise an alert.
pub const ALERT_THRESHOLD: u8 = 70;

/// Extensions that commonly carry executable or script content.
pub const HIGH_RISK_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "ps1", "vbs", "js", "jar", "sh", "py", "dll",
];

/// Extensions that commonly carry documents or user data.
pub const SENSITIVE_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "csv", "ppt", "pptx", "txt", "rtf", "db", "sql", "json",
    "xml", "config", "env",
];

/// Name fragments that suggest sensitive content. The bonus applies at
/// most once no matter how many fragments the name contains.
pub const SENSITIVE_NAME_PATTERNS: &[&str] = &[
    "password",
    "secret",
    "confidential",
    "private",
    "account",
    "credit",
    "ssn",
    "social",
    "bank",
];

/// Base score per event kind
fn base_score(event_type: EventType) -> u32 {
    match event_type {
        EventType::Create => 30,
        EventType::Modify => 20,
        EventType::Delete => 40,
        EventType::CreateDir => 15,
        EventType::DeleteDir => 35,
        EventType::Other => 10,
    }
}

/// Compute the risk score for an event.
///
/// Extension and name matching is case-insensitive; the extension bonus
/// picks the high-risk table first and falls back to the sensitive table,
/// never both.
pub fn score(event: &FileEvent) -> u8 {
    let mut total = base_score(event.event_type);

    if event.is_external_drive {
        total += 30;
    }

    let extension = event.extension.to_ascii_lowercase();
    if HIGH_RISK_EXTENSIONS.contains(&extension.as_str()) {
        total += 25;
    } else if SENSITIVE_EXTENSIONS.contains(&extension.as_str()) {
        total += 15;
    }

    let name = event.name.to_ascii_lowercase();
    if SENSITIVE_NAME_PATTERNS
        .iter()
        .any(|pattern| name.contains(pattern))
    {
        total += 20;
    }

    let path = event.path.to_string_lossy().to_ascii_lowercase();
    if path.contains("temp") || path.contains("tmp") {
        total += 10;
    }

    total.min(100) as u8
}

/// Map a risk score to an alert severity in 1..=5.
///
/// Ceiling of score/20, so 1..=20 maps to 1 and 81..=100 maps to 5. A
/// zero score still yields the minimum severity.
pub fn severity_for(score: u8) -> u8 {
    let severity = (u32::from(score) + 19) / 20;
    severity.clamp(1, 5) as u8
}
