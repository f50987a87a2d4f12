//! Baseline-relative anomaly detection
//!
//! Each pass pulls the trailing window of events for an actor, reduces
//! them to counts, and compares the counts against multiples of the
//! actor's baseline averages. Detection is stateless: nothing carries
//! over between passes, so a pass can be rerun or run ad hoc from the
//! CLI and give the same answer for the same window.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use vigil_core::event::{Anomaly, AnomalyKind, DetectionWindow, EventRecord, EventType};
use vigil_store::ActivityStore;

use crate::baseline::{Baseline, BaselineTracker};

/// Trailing window a detection pass looks at
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Event counts for one detection window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowCounts {
    pub total: u64,
    pub by_type: HashMap<EventType, u64>,
    pub external: u64,
}

impl WindowCounts {
    pub fn from_events(events: &[EventRecord]) -> Self {
        let mut counts = Self::default();
        for record in events {
            counts.total += 1;
            *counts.by_type.entry(record.event.event_type).or_default() += 1;
            if record.event.is_external_drive {
                counts.external += 1;
            }
        }
        counts
    }

    pub fn of_type(&self, event_type: EventType) -> u64 {
        self.by_type.get(&event_type).copied().unwrap_or(0)
    }
}

/// One detection rule: fires when the observed count exceeds a
/// multiple of the matching baseline average.
struct AnomalyRule {
    kind: AnomalyKind,
    severity: u8,
    multiplier: f64,
    description: &'static str,
    observed: fn(&WindowCounts) -> u64,
    expected: fn(&Baseline) -> f64,
}

fn observed_total(counts: &WindowCounts) -> u64 {
    counts.total
}

fn observed_deletes(counts: &WindowCounts) -> u64 {
    counts.of_type(EventType::Delete)
}

fn expected_events(baseline: &Baseline) -> f64 {
    baseline.avg_events_per_hour
}

fn expected_deletes(baseline: &Baseline) -> f64 {
    baseline.avg_deletes_per_hour
}

const RULES: &[AnomalyRule] = &[
    AnomalyRule {
        kind: AnomalyKind::HighVolume,
        severity: 3,
        multiplier: 3.0,
        description: "Unusually high number of file operations",
        observed: observed_total,
        expected: expected_events,
    },
    AnomalyRule {
        kind: AnomalyKind::HighDeletion,
        severity: 4,
        multiplier: 2.0,
        description: "Unusually high number of file deletions",
        observed: observed_deletes,
        expected: expected_deletes,
    },
];

/// Run every rule over one window's counts. A rule fires only on a
/// strict exceedance, so activity exactly at the threshold is normal.
pub fn evaluate_rules(
    counts: &WindowCounts,
    baseline: &Baseline,
    window: &DetectionWindow,
) -> Vec<Anomaly> {
    RULES
        .iter()
        .filter(|rule| {
            let observed = (rule.observed)(counts) as f64;
            observed > rule.multiplier * (rule.expected)(baseline)
        })
        .map(|rule| Anomaly {
            kind: rule.kind,
            description: rule.description.to_string(),
            severity: rule.severity,
            window: window.clone(),
        })
        .collect()
}

/// Runs detection passes against the persisted event log
pub struct AnomalyDetector {
    store: Arc<dyn ActivityStore>,
    tracker: Arc<BaselineTracker>,
    window_hours: i64,
}

impl AnomalyDetector {
    pub fn new(store: Arc<dyn ActivityStore>, tracker: Arc<BaselineTracker>) -> Self {
        Self {
            store,
            tracker,
            window_hours: DEFAULT_WINDOW_HOURS,
        }
    }

    pub fn with_window_hours(mut self, window_hours: i64) -> Self {
        self.window_hours = window_hours.max(1);
        self
    }

    /// Run one detection pass for an actor.
    ///
    /// A store failure is logged and yields no anomalies; the next
    /// scheduled pass covers the same trailing window anyway.
    pub async fn detect(&self, actor: &str) -> Vec<Anomaly> {
        let until = Utc::now();
        let since = until - chrono::Duration::hours(self.window_hours);

        let events = match self.store.events_since(Some(actor), since).await {
            Ok(events) => events,
            Err(error) => {
                warn!(actor, %error, "detection query failed, skipping pass");
                return Vec::new();
            }
        };

        let window = DetectionWindow {
            since,
            until,
            events_considered: events.len(),
        };
        let counts = WindowCounts::from_events(&events);
        let baseline = self.tracker.baseline_for(actor).await;

        let anomalies = evaluate_rules(&counts, &baseline, &window);
        debug!(
            actor,
            events = window.events_considered,
            anomalies = anomalies.len(),
            fallback_baseline = baseline.is_fallback,
            "detection pass complete"
        );
        anomalies
    }
}
