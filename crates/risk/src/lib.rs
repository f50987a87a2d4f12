//! Baseline tracking and anomaly detection for Vigil
//!
//! This crate provides:
//! - Per-user activity baselines computed from the persisted event log
//! - A TTL cache so detector passes don't recompute within a window
//! - The observed-vs-multiple-of-baseline anomaly rule table

pub mod anomaly;
pub mod baseline;

// Re-exports
pub use anomaly::{evaluate_rules, AnomalyDetector, WindowCounts};
pub use baseline::{Baseline, BaselineTracker};

/// Shared in-memory store double for this crate's tests.
#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use vigil_core::event::{Alert, EventRecord, FileEvent};
    use vigil_store::{ActivityStore, Result};

    #[derive(Default)]
    pub struct MemStore {
        events: Mutex<Vec<EventRecord>>,
        pub fail_reads: AtomicBool,
        pub read_count: AtomicUsize,
    }

    impl MemStore {
        pub fn seeded(events: Vec<FileEvent>) -> Self {
            let store = Self::default();
            {
                let mut guard = store.events.lock().unwrap();
                for (index, event) in events.into_iter().enumerate() {
                    guard.push(EventRecord {
                        id: index as u64 + 1,
                        event,
                    });
                }
            }
            store
        }
    }

    #[async_trait]
    impl ActivityStore for MemStore {
        async fn insert_event(&self, event: &FileEvent) -> Result<u64> {
            let mut guard = self.events.lock().unwrap();
            let id = guard.len() as u64 + 1;
            guard.push(EventRecord {
                id,
                event: event.clone(),
            });
            Ok(id)
        }

        async fn insert_alert(&self, _alert: &Alert) -> Result<u64> {
            Ok(1)
        }

        async fn events_since(
            &self,
            actor: Option<&str>,
            since: DateTime<Utc>,
        ) -> Result<Vec<EventRecord>> {
            self.read_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads.load(Ordering::SeqCst) {
                anyhow::bail!("simulated store failure");
            }
            let guard = self.events.lock().unwrap();
            Ok(guard
                .iter()
                .filter(|record| record.event.created_at >= since)
                .filter(|record| actor.map_or(true, |a| record.event.actor == a))
                .cloned()
                .collect())
        }
    }
}
