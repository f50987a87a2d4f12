//! In-process notification fan-out
//!
//! One broadcast channel per topic. Publishing never blocks and never
//! fails: with no subscribers the message is dropped, and a subscriber
//! that falls behind loses its oldest messages, not the publisher.

use std::fmt;
use tokio::sync::broadcast;

use crate::event::{Anomaly, FileEventMessage, RiskAlertMessage};

/// Messages buffered per topic before slow subscribers start lagging
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Fan-out hub for pipeline notifications
///
/// Clones share the underlying channels, so any clone can publish or
/// subscribe.
#[derive(Clone)]
pub struct EventBus {
    events: broadcast::Sender<FileEventMessage>,
    alerts: broadcast::Sender<RiskAlertMessage>,
    anomalies: broadcast::Sender<Anomaly>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        let (alerts, _) = broadcast::channel(capacity);
        let (anomalies, _) = broadcast::channel(capacity);
        Self {
            events,
            alerts,
            anomalies,
            capacity,
        }
    }

    /// Publish a processed file event. Delivery is best-effort.
    pub fn publish_event(&self, message: FileEventMessage) {
        let _ = self.events.send(message);
    }

    /// Publish a raised alert. Delivery is best-effort.
    pub fn publish_alert(&self, message: RiskAlertMessage) {
        let _ = self.alerts.send(message);
    }

    /// Publish a detected anomaly. Delivery is best-effort.
    pub fn publish_anomaly(&self, anomaly: Anomaly) {
        let _ = self.anomalies.send(anomaly);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<FileEventMessage> {
        self.events.subscribe()
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<RiskAlertMessage> {
        self.alerts.subscribe()
    }

    pub fn subscribe_anomalies(&self) -> broadcast::Receiver<Anomaly> {
        self.anomalies.subscribe()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("event_subscribers", &self.events.receiver_count())
            .field("alert_subscribers", &self.alerts.receiver_count())
            .field("anomaly_subscribers", &self.anomalies.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AnomalyKind, DetectionWindow};
    use chrono::Utc;
    use tokio::sync::broadcast::error::RecvError;

    fn message(id: u64) -> FileEventMessage {
        FileEventMessage {
            id,
            event_type: crate::event::EventType::Modify,
            file_path: "/home/a/notes.txt".to_string(),
            file_name: "notes.txt".to_string(),
            risk_score: 35,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_all_subscribers_receive_each_message() {
        let bus = EventBus::default();
        let mut first = bus.subscribe_events();
        let mut second = bus.subscribe_events();

        bus.publish_event(message(1));

        assert_eq!(first.recv().await.unwrap().id, 1);
        assert_eq!(second.recv().await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.publish_event(message(1));
        bus.publish_alert(RiskAlertMessage {
            alert_type: "high_risk_activity".to_string(),
            description: "test".to_string(),
            severity: 4,
            risk_score: 75,
            file_event_id: 1,
        });
        bus.publish_anomaly(Anomaly {
            kind: AnomalyKind::HighVolume,
            description: "test".to_string(),
            severity: 3,
            window: DetectionWindow {
                since: Utc::now(),
                until: Utc::now(),
                events_considered: 0,
            },
        });
        // Nothing to assert beyond "no panic": sends are fire-and-forget.
    }

    #[tokio::test]
    async fn test_dropped_subscriber_does_not_affect_others() {
        let bus = EventBus::default();
        let first = bus.subscribe_events();
        let mut second = bus.subscribe_events();

        drop(first);
        bus.publish_event(message(7));

        assert_eq!(second.recv().await.unwrap().id, 7);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_instead_of_blocking_publisher() {
        let bus = EventBus::new(4);
        let mut slow = bus.subscribe_events();

        for id in 0..10 {
            bus.publish_event(message(id));
        }

        // The oldest messages are gone; the receiver reports the gap once
        // and then resumes from what is still buffered.
        match slow.recv().await {
            Err(RecvError::Lagged(missed)) => assert_eq!(missed, 6),
            other => panic!("expected lag error, got {other:?}"),
        }
        assert_eq!(slow.recv().await.unwrap().id, 6);
    }

    #[tokio::test]
    async fn test_topics_are_independent() {
        let bus = EventBus::default();
        let mut alerts = bus.subscribe_alerts();

        bus.publish_event(message(1));
        bus.publish_alert(RiskAlertMessage {
            alert_type: "high_risk_activity".to_string(),
            description: "High risk delete activity detected on file: x".to_string(),
            severity: 5,
            risk_score: 100,
            file_event_id: 1,
        });

        // The alert subscriber sees only the alert topic.
        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert.file_event_id, 1);
        assert!(alerts.try_recv().is_err());
    }
}
