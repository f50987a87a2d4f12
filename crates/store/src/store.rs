//! Append-mostly activity store using sled
//!
//! Three trees: `events` keyed by id, `events_by_time` as a
//! (timestamp, id) index over them, and `alerts` keyed by id. Ids are
//! monotonic u64 counters rebuilt from the highest existing key on
//! open. Keys are big-endian so sled's lexicographic order is numeric
//! order, which makes time-window scans a single range call.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use vigil_core::event::{Alert, AlertRecord, EventRecord, EventType, FileEvent};

use crate::Result;

/// Async persistence seam used by the pipeline and the risk layer.
///
/// The pipeline only needs these three calls; everything else on
/// [`SledStore`] is a reporting concern.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn insert_event(&self, event: &FileEvent) -> Result<u64>;
    async fn insert_alert(&self, alert: &Alert) -> Result<u64>;
    async fn events_since(
        &self,
        actor: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>>;
}

/// Score band used by event queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    /// Lower bound of the medium band
    pub const MEDIUM_FLOOR: u8 = 40;

    fn matches(self, score: u8, high_floor: u8) -> bool {
        match self {
            RiskBand::High => score >= high_floor,
            RiskBand::Medium => score >= Self::MEDIUM_FLOOR && score < high_floor,
            RiskBand::Low => score < Self::MEDIUM_FLOOR,
        }
    }
}

impl FromStr for RiskBand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(RiskBand::Low),
            "medium" => Ok(RiskBand::Medium),
            "high" => Ok(RiskBand::High),
            _ => Err(format!("unknown risk band '{s}' (expected low, medium or high)")),
        }
    }
}

/// Filter for event queries, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFilter {
    pub event_type: Option<EventType>,
    pub risk: Option<RiskBand>,
    /// Case-insensitive substring match on name or path
    pub search: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
    /// Where the high band starts; display configuration, not the
    /// alert threshold
    pub high_floor: u8,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            event_type: None,
            risk: None,
            search: None,
            since: None,
            limit: 50,
            offset: 0,
            high_floor: 70,
        }
    }
}

impl EventFilter {
    pub fn matches(&self, record: &EventRecord) -> bool {
        if let Some(event_type) = self.event_type {
            if record.event.event_type != event_type {
                return false;
            }
        }
        if let Some(band) = self.risk {
            if !band.matches(record.event.risk_score, self.high_floor) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.event.created_at < since {
                return false;
            }
        }
        if let Some(ref needle) = self.search {
            let needle = needle.to_lowercase();
            let name = record.event.name.to_lowercase();
            let path = record.event.path.to_string_lossy().to_lowercase();
            if !name.contains(&needle) && !path.contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// Persistent activity store
pub struct SledStore {
    /// Sled database
    db: Db,
    /// id -> EventRecord
    events: sled::Tree,
    /// (created_at millis, id) -> id
    events_by_time: sled::Tree,
    /// id -> AlertRecord
    alerts: sled::Tree,
    /// Monotonic id counters
    event_seq: AtomicU64,
    alert_seq: AtomicU64,
}

fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn time_key(ts_ms: u64, id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&ts_ms.to_be_bytes());
    key[8..].copy_from_slice(&id.to_be_bytes());
    key
}

fn millis(at: DateTime<Utc>) -> u64 {
    at.timestamp_millis().max(0) as u64
}

fn last_id(tree: &sled::Tree) -> Result<u64> {
    Ok(match tree.last()? {
        Some((key, _)) => u64::from_be_bytes(
            key.as_ref()
                .try_into()
                .context("malformed id key in store")?,
        ),
        None => 0,
    })
}

impl SledStore {
    /// Open or create a store at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)?;
        let events = db.open_tree("events")?;
        let events_by_time = db.open_tree("events_by_time")?;
        let alerts = db.open_tree("alerts")?;

        // Continue id sequences from whatever is already on disk.
        let event_seq = AtomicU64::new(last_id(&events)? + 1);
        let alert_seq = AtomicU64::new(last_id(&alerts)? + 1);

        Ok(Self {
            db,
            events,
            events_by_time,
            alerts,
            event_seq,
            alert_seq,
        })
    }

    /// Append an event, returning its assigned id
    pub fn insert_event(&self, event: &FileEvent) -> Result<u64> {
        let id = self.event_seq.fetch_add(1, Ordering::SeqCst);
        let record = EventRecord {
            id,
            event: event.clone(),
        };
        let value = bincode::serialize(&record)?;

        self.events.insert(id_key(id), value)?;
        self.events_by_time.insert(
            time_key(millis(event.created_at), id),
            id_key(id).to_vec(),
        )?;

        // Flush to ensure durability
        self.db.flush()?;

        Ok(id)
    }

    /// Append an alert, returning its assigned id
    pub fn insert_alert(&self, alert: &Alert) -> Result<u64> {
        let id = self.alert_seq.fetch_add(1, Ordering::SeqCst);
        let record = AlertRecord {
            id,
            alert: alert.clone(),
            resolved: false,
            created_at: Utc::now(),
        };
        let value = bincode::serialize(&record)?;

        self.alerts.insert(id_key(id), value)?;
        self.db.flush()?;

        Ok(id)
    }

    /// Get an event by id
    pub fn event(&self, id: u64) -> Result<Option<EventRecord>> {
        match self.events.get(id_key(id))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Events observed at or after `since`, oldest first, optionally
    /// restricted to one actor
    pub fn events_since(
        &self,
        actor: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        let start = time_key(millis(since), 0);
        let mut records = Vec::new();

        for item in self.events_by_time.range(start.to_vec()..) {
            let (_, id_bytes) = item?;
            let Some(value) = self.events.get(&id_bytes)? else {
                continue;
            };
            let record: EventRecord = bincode::deserialize(&value)?;
            if let Some(actor) = actor {
                if record.event.actor != actor {
                    continue;
                }
            }
            records.push(record);
        }

        Ok(records)
    }

    /// The most recent events, newest first
    pub fn recent_events(&self, limit: usize) -> Result<Vec<EventRecord>> {
        let mut records = Vec::new();
        for item in self.events.iter().rev().take(limit) {
            let (_, value) = item?;
            records.push(bincode::deserialize(&value)?);
        }
        Ok(records)
    }

    /// Filtered event query, newest first
    pub fn query_events(&self, filter: &EventFilter) -> Result<Vec<EventRecord>> {
        let mut matched = 0usize;
        let mut records = Vec::new();

        for item in self.events.iter().rev() {
            let (_, value) = item?;
            let record: EventRecord = bincode::deserialize(&value)?;
            if !filter.matches(&record) {
                continue;
            }
            matched += 1;
            if matched <= filter.offset {
                continue;
            }
            records.push(record);
            if records.len() >= filter.limit {
                break;
            }
        }

        Ok(records)
    }

    /// Alerts, newest first
    pub fn alerts(&self, unresolved_only: bool, limit: usize) -> Result<Vec<AlertRecord>> {
        let mut records = Vec::new();
        for item in self.alerts.iter().rev() {
            let (_, value) = item?;
            let record: AlertRecord = bincode::deserialize(&value)?;
            if unresolved_only && record.resolved {
                continue;
            }
            records.push(record);
            if records.len() >= limit {
                break;
            }
        }
        Ok(records)
    }

    /// Mark an alert resolved. Returns false if the id is unknown.
    /// Resolving an already-resolved alert is a no-op that still
    /// reports success.
    pub fn resolve_alert(&self, id: u64) -> Result<bool> {
        let key = id_key(id);
        let Some(value) = self.alerts.get(key)? else {
            return Ok(false);
        };
        let mut record: AlertRecord = bincode::deserialize(&value)?;
        if !record.resolved {
            record.resolved = true;
            self.alerts.insert(key, bincode::serialize(&record)?)?;
            self.db.flush()?;
        }
        Ok(true)
    }

    /// Most recently inserted event
    pub fn latest_event(&self) -> Result<Option<EventRecord>> {
        match self.events.last()? {
            Some((_, value)) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Total number of stored events
    pub fn event_count(&self) -> u64 {
        self.events.len() as u64
    }

    /// Total number of stored alerts
    pub fn alert_count(&self) -> u64 {
        self.alerts.len() as u64
    }

    /// Number of alerts that have not been resolved
    pub fn unresolved_alert_count(&self) -> Result<u64> {
        let mut count = 0u64;
        for item in self.alerts.iter() {
            let (_, value) = item?;
            let record: AlertRecord = bincode::deserialize(&value)?;
            if !record.resolved {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Decode every stored event, oldest first
    pub(crate) fn scan_events(&self) -> impl Iterator<Item = Result<EventRecord>> + '_ {
        self.events.iter().map(|item| {
            let (_, value) = item?;
            Ok(bincode::deserialize(&value)?)
        })
    }
}

#[async_trait]
impl ActivityStore for SledStore {
    async fn insert_event(&self, event: &FileEvent) -> Result<u64> {
        SledStore::insert_event(self, event)
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<u64> {
        SledStore::insert_alert(self, alert)
    }

    async fn events_since(
        &self,
        actor: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        SledStore::events_since(self, actor, since)
    }
}
