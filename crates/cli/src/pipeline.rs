//! Event pipeline: classification, scoring, persistence, fan-out
//!
//! One debounced change in, at most one stored event and one alert
//! out. Changes are processed strictly in arrival order, so event ids
//! follow the order things happened on disk; store writes are bounded
//! by a timeout so a wedged disk backs up the watcher channel instead
//! of hanging the daemon.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use vigil_core::event::{Alert, FileEvent, FileEventMessage, RiskAlertMessage};
use vigil_core::{score, severity_for, EventBus, ALERT_THRESHOLD};
use vigil_store::ActivityStore;
use vigil_watcher::RawChange;

/// How long a store write may take before the event is dropped
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// When to turn a scored event into an alert
#[derive(Debug, Clone, Copy)]
pub struct AlertPolicy {
    /// Scores strictly above this raise an alert
    pub threshold: u8,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            threshold: ALERT_THRESHOLD,
        }
    }
}

impl AlertPolicy {
    /// Build the alert for an event, if its score crosses the threshold
    pub fn evaluate(&self, event: &FileEvent, event_id: u64) -> Option<Alert> {
        if event.risk_score <= self.threshold {
            return None;
        }
        Some(Alert {
            alert_type: "high_risk_activity".to_string(),
            description: format!(
                "High risk {} activity detected on file: {}",
                event.event_type, event.name
            ),
            severity: severity_for(event.risk_score),
            risk_score: event.risk_score,
            source_event_id: event_id,
        })
    }
}

/// Counters shared with the status surface
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    pub events_processed: AtomicU64,
    pub alerts_raised: AtomicU64,
    pub store_failures: AtomicU64,
}

/// The per-change processing chain
pub struct Pipeline {
    store: Arc<dyn ActivityStore>,
    bus: EventBus,
    policy: AlertPolicy,
    actor: String,
    store_timeout: Duration,
    metrics: Arc<PipelineMetrics>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        bus: EventBus,
        policy: AlertPolicy,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bus,
            policy,
            actor: actor.into(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            metrics: Arc::new(PipelineMetrics::default()),
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Drain the watcher channel until it closes
    pub async fn run(self: Arc<Self>, mut changes: mpsc::Receiver<RawChange>) {
        while let Some(change) = changes.recv().await {
            self.process(change).await;
        }
        debug!("watcher channel closed, pipeline exiting");
    }

    /// Run one change through classify, score, persist and fan-out
    pub async fn process(&self, change: RawChange) {
        // 1. Classify the raw change and score it
        let mut event = vigil_watcher::classify(&change, &self.actor, Utc::now());
        event.risk_score = score(&event);

        // 2. Persist; an event we cannot store is an event we drop
        let insert = self.store.insert_event(&event);
        let event_id = match tokio::time::timeout(self.store_timeout, insert).await {
            Ok(Ok(id)) => id,
            Ok(Err(error)) => {
                self.metrics.store_failures.fetch_add(1, Ordering::Relaxed);
                warn!(path = %event.path.display(), %error, "failed to store event, dropping");
                return;
            }
            Err(_) => {
                self.metrics.store_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    path = %event.path.display(),
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "store write timed out, dropping event"
                );
                return;
            }
        };
        self.metrics.events_processed.fetch_add(1, Ordering::Relaxed);

        // 3. Fan the stored event out to subscribers
        self.bus
            .publish_event(FileEventMessage::new(event_id, &event));

        // 4. Raise an alert if the score crosses the policy threshold.
        //    Fan-out follows persistence: an alert that failed to store
        //    is not announced.
        if let Some(alert) = self.policy.evaluate(&event, event_id) {
            let insert = self.store.insert_alert(&alert);
            match tokio::time::timeout(self.store_timeout, insert).await {
                Ok(Ok(_alert_id)) => {
                    self.metrics.alerts_raised.fetch_add(1, Ordering::Relaxed);
                    self.bus.publish_alert(RiskAlertMessage::from(&alert));
                }
                Ok(Err(error)) => {
                    self.metrics.store_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(event_id, %error, "failed to store alert");
                }
                Err(_) => {
                    self.metrics.store_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(event_id, "alert store write timed out");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vigil_core::event::EventType;

    fn scored_event(score: u8) -> FileEvent {
        FileEvent {
            event_type: EventType::Delete,
            path: PathBuf::from("/home/alice/Documents/plan.docx"),
            name: "plan.docx".to_string(),
            extension: "docx".to_string(),
            is_external_drive: false,
            risk_score: score,
            actor: "alice".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_score_at_threshold_raises_nothing() {
        let policy = AlertPolicy::default();
        assert!(policy.evaluate(&scored_event(70), 1).is_none());
        assert!(policy.evaluate(&scored_event(0), 1).is_none());
    }

    #[test]
    fn test_score_above_threshold_raises_alert() {
        let policy = AlertPolicy::default();
        let alert = policy.evaluate(&scored_event(71), 9).unwrap();

        assert_eq!(alert.alert_type, "high_risk_activity");
        assert_eq!(
            alert.description,
            "High risk delete activity detected on file: plan.docx"
        );
        assert_eq!(alert.severity, 4);
        assert_eq!(alert.risk_score, 71);
        assert_eq!(alert.source_event_id, 9);
    }

    #[test]
    fn test_max_score_is_severity_five() {
        let policy = AlertPolicy::default();
        let alert = policy.evaluate(&scored_event(100), 1).unwrap();
        assert_eq!(alert.severity, 5);
    }

    #[test]
    fn test_custom_threshold() {
        let policy = AlertPolicy { threshold: 30 };
        assert!(policy.evaluate(&scored_event(30), 1).is_none());
        assert!(policy.evaluate(&scored_event(31), 1).is_some());
    }
}
