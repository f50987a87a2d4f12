//! Per-user activity baselines
//!
//! A baseline is a handful of rolling averages over a trailing window
//! of the persisted event log. It is recomputed per query; the only
//! state the tracker keeps is a short-TTL cache so a detector pass does
//! not hammer the store. When there is not enough history to be
//! meaningful, an explicit fallback baseline is used and flagged as
//! such rather than silently comparing against near-zero averages.

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use vigil_core::event::{EventRecord, EventType};
use vigil_store::ActivityStore;

/// Trailing window a baseline is computed over
pub const BASELINE_WINDOW_HOURS: i64 = 24;

/// How long a computed baseline stays valid
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Fewer sampled events than this and the fallback baseline applies
pub const DEFAULT_MIN_SAMPLE_EVENTS: usize = 24;

pub const FALLBACK_AVG_EVENTS_PER_HOUR: f64 = 20.0;
pub const FALLBACK_AVG_DELETES_PER_HOUR: f64 = 5.0;
pub const FALLBACK_AVG_EXTERNAL_PER_HOUR: f64 = 3.0;
pub const FALLBACK_COMMON_EXTENSIONS: &[&str] = &["docx", "pdf", "jpg", "png"];

/// How many extensions a baseline keeps
const COMMON_EXTENSION_COUNT: usize = 4;

/// Rolling activity averages for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub avg_events_per_hour: f64,
    pub avg_deletes_per_hour: f64,
    pub avg_external_per_hour: f64,
    /// Most frequent extensions in the window, most frequent first
    pub common_extensions: Vec<String>,
    /// How many events the averages were computed from
    pub sampled_events: usize,
    /// True when this is the assumed baseline, not a computed one
    pub is_fallback: bool,
}

impl Baseline {
    /// The assumed baseline for users without enough history
    pub fn fallback() -> Self {
        Self {
            avg_events_per_hour: FALLBACK_AVG_EVENTS_PER_HOUR,
            avg_deletes_per_hour: FALLBACK_AVG_DELETES_PER_HOUR,
            avg_external_per_hour: FALLBACK_AVG_EXTERNAL_PER_HOUR,
            common_extensions: FALLBACK_COMMON_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            sampled_events: 0,
            is_fallback: true,
        }
    }

    /// Aggregate a window of events into a baseline.
    pub fn from_events(events: &[EventRecord], window_hours: f64) -> Self {
        let hours = window_hours.max(1.0);

        let mut deletes = 0usize;
        let mut external = 0usize;
        let mut extensions: HashMap<&str, usize> = HashMap::new();

        for record in events {
            if record.event.event_type == EventType::Delete {
                deletes += 1;
            }
            if record.event.is_external_drive {
                external += 1;
            }
            if !record.event.extension.is_empty() {
                *extensions.entry(record.event.extension.as_str()).or_default() += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = extensions.into_iter().collect();
        // Ties break alphabetically so the result is stable.
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(COMMON_EXTENSION_COUNT);

        Self {
            avg_events_per_hour: events.len() as f64 / hours,
            avg_deletes_per_hour: deletes as f64 / hours,
            avg_external_per_hour: external as f64 / hours,
            common_extensions: ranked.into_iter().map(|(ext, _)| ext.to_string()).collect(),
            sampled_events: events.len(),
            is_fallback: false,
        }
    }
}

struct CachedBaseline {
    computed_at: Instant,
    baseline: Baseline,
}

/// Computes and caches per-user baselines
pub struct BaselineTracker {
    store: Arc<dyn ActivityStore>,
    ttl: Duration,
    min_sample_events: usize,
    cache: DashMap<String, CachedBaseline>,
}

impl BaselineTracker {
    pub fn new(store: Arc<dyn ActivityStore>, ttl: Duration, min_sample_events: usize) -> Self {
        Self {
            store,
            ttl,
            min_sample_events,
            cache: DashMap::new(),
        }
    }

    pub fn with_defaults(store: Arc<dyn ActivityStore>) -> Self {
        Self::new(store, DEFAULT_CACHE_TTL, DEFAULT_MIN_SAMPLE_EVENTS)
    }

    /// The current baseline for an actor, from cache when fresh.
    ///
    /// Never fails: a store error degrades to the fallback baseline,
    /// which is also cached so a struggling store is not hammered.
    pub async fn baseline_for(&self, actor: &str) -> Baseline {
        if let Some(cached) = self.cache.get(actor) {
            if cached.computed_at.elapsed() < self.ttl {
                return cached.baseline.clone();
            }
        }

        let baseline = self.compute(actor).await;
        self.cache.insert(
            actor.to_string(),
            CachedBaseline {
                computed_at: Instant::now(),
                baseline: baseline.clone(),
            },
        );
        baseline
    }

    /// Drop the cached baseline for an actor
    pub fn invalidate(&self, actor: &str) {
        self.cache.remove(actor);
    }

    async fn compute(&self, actor: &str) -> Baseline {
        let since = Utc::now() - chrono::Duration::hours(BASELINE_WINDOW_HOURS);
        let events = match self.store.events_since(Some(actor), since).await {
            Ok(events) => events,
            Err(error) => {
                warn!(actor, %error, "baseline query failed, using fallback");
                return Baseline::fallback();
            }
        };

        if events.len() < self.min_sample_events {
            debug!(
                actor,
                sampled = events.len(),
                needed = self.min_sample_events,
                "not enough history, using fallback baseline"
            );
            return Baseline {
                sampled_events: events.len(),
                ..Baseline::fallback()
            };
        }

        Baseline::from_events(&events, BASELINE_WINDOW_HOURS as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemStore;
    use chrono::{DateTime, Duration as TimeDelta, Utc};
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;
    use vigil_core::event::FileEvent;

    fn record(
        id: u64,
        event_type: EventType,
        extension: &str,
        external: bool,
        at: DateTime<Utc>,
    ) -> EventRecord {
        EventRecord {
            id,
            event: sample(event_type, extension, external, at),
        }
    }

    fn sample(
        event_type: EventType,
        extension: &str,
        external: bool,
        at: DateTime<Utc>,
    ) -> FileEvent {
        let name = if extension.is_empty() {
            "file".to_string()
        } else {
            format!("file.{extension}")
        };
        FileEvent {
            event_type,
            path: PathBuf::from(format!("/home/alice/Documents/{name}")),
            name,
            extension: extension.to_string(),
            is_external_drive: external,
            risk_score: 30,
            actor: "alice".to_string(),
            created_at: at,
        }
    }

    #[test]
    fn test_from_events_averages() {
        let now = Utc::now();
        let mut events = Vec::new();
        for i in 0..48u64 {
            let event_type = if i < 12 {
                EventType::Delete
            } else {
                EventType::Modify
            };
            events.push(record(i + 1, event_type, "txt", i < 6, now));
        }

        let baseline = Baseline::from_events(&events, 24.0);
        assert_eq!(baseline.avg_events_per_hour, 2.0);
        assert_eq!(baseline.avg_deletes_per_hour, 0.5);
        assert_eq!(baseline.avg_external_per_hour, 0.25);
        assert_eq!(baseline.sampled_events, 48);
        assert!(!baseline.is_fallback);
    }

    #[test]
    fn test_directory_deletes_are_not_file_deletes() {
        let now = Utc::now();
        let events = vec![
            record(1, EventType::Delete, "txt", false, now),
            record(2, EventType::DeleteDir, "", false, now),
        ];
        let baseline = Baseline::from_events(&events, 1.0);
        assert_eq!(baseline.avg_deletes_per_hour, 1.0);
    }

    #[test]
    fn test_common_extensions_ranked_and_capped() {
        let now = Utc::now();
        let mut events = Vec::new();
        let mut id = 0u64;
        for (extension, count) in [("pdf", 5), ("txt", 3), ("docx", 3), ("xlsx", 2), ("png", 1)] {
            for _ in 0..count {
                id += 1;
                events.push(record(id, EventType::Create, extension, false, now));
            }
        }
        // Extensionless events don't pollute the ranking.
        id += 1;
        events.push(record(id, EventType::Create, "", false, now));

        let baseline = Baseline::from_events(&events, 24.0);
        assert_eq!(
            baseline.common_extensions,
            vec!["pdf", "docx", "txt", "xlsx"]
        );
    }

    #[test]
    fn test_fallback_constants() {
        let fallback = Baseline::fallback();
        assert!(fallback.is_fallback);
        assert_eq!(fallback.avg_events_per_hour, 20.0);
        assert_eq!(fallback.avg_deletes_per_hour, 5.0);
        assert_eq!(fallback.avg_external_per_hour, 3.0);
        assert_eq!(fallback.common_extensions, vec!["docx", "pdf", "jpg", "png"]);
    }

    #[tokio::test]
    async fn test_under_sampled_actor_gets_fallback() {
        let now = Utc::now();
        let events = (0..5)
            .map(|i| sample(EventType::Create, "txt", false, now - TimeDelta::minutes(i)))
            .collect();
        let store = Arc::new(MemStore::seeded(events));
        let tracker = BaselineTracker::new(store, DEFAULT_CACHE_TTL, 24);

        let baseline = tracker.baseline_for("alice").await;
        assert!(baseline.is_fallback);
        assert_eq!(baseline.sampled_events, 5);
        assert_eq!(baseline.avg_events_per_hour, 20.0);
    }

    #[tokio::test]
    async fn test_sampled_actor_gets_computed_baseline() {
        let now = Utc::now();
        let events = (0..48)
            .map(|i| sample(EventType::Create, "txt", false, now - TimeDelta::minutes(i)))
            .collect();
        let store = Arc::new(MemStore::seeded(events));
        let tracker = BaselineTracker::new(store, DEFAULT_CACHE_TTL, 24);

        let baseline = tracker.baseline_for("alice").await;
        assert!(!baseline.is_fallback);
        assert_eq!(baseline.sampled_events, 48);
        assert_eq!(baseline.avg_events_per_hour, 2.0);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_fallback() {
        let store = Arc::new(MemStore::default());
        store.fail_reads.store(true, Ordering::SeqCst);
        let tracker = BaselineTracker::new(store, DEFAULT_CACHE_TTL, 24);

        let baseline = tracker.baseline_for("alice").await;
        assert!(baseline.is_fallback);
    }

    #[tokio::test]
    async fn test_cache_avoids_requery_within_ttl() {
        let store = Arc::new(MemStore::default());
        let tracker = BaselineTracker::new(
            Arc::clone(&store) as Arc<dyn ActivityStore>,
            Duration::from_secs(300),
            24,
        );

        tracker.baseline_for("alice").await;
        tracker.baseline_for("alice").await;
        assert_eq!(store.read_count.load(Ordering::SeqCst), 1);

        tracker.invalidate("alice");
        tracker.baseline_for("alice").await;
        assert_eq!(store.read_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_recomputes() {
        let store = Arc::new(MemStore::default());
        let tracker = BaselineTracker::new(
            Arc::clone(&store) as Arc<dyn ActivityStore>,
            Duration::ZERO,
            24,
        );

        tracker.baseline_for("alice").await;
        tracker.baseline_for("alice").await;
        assert_eq!(store.read_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_baselines_are_per_actor() {
        let now = Utc::now();
        let mut events: Vec<FileEvent> = (0..30)
            .map(|i| sample(EventType::Create, "txt", false, now - TimeDelta::minutes(i)))
            .collect();
        let mut bobs = sample(EventType::Create, "exe", false, now);
        bobs.actor = "bob".to_string();
        events.push(bobs);

        let store = Arc::new(MemStore::seeded(events));
        let tracker = BaselineTracker::new(store, DEFAULT_CACHE_TTL, 24);

        let alice = tracker.baseline_for("alice").await;
        let bob = tracker.baseline_for("bob").await;
        assert!(!alice.is_fallback);
        assert!(bob.is_fallback);
        assert_eq!(bob.sampled_events, 1);
    }
}
