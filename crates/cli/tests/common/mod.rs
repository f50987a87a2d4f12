//! Common fixtures for integration tests

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vigil_core::event::{Alert, EventRecord, FileEvent};
use vigil_store::{ActivityStore, Result};

/// In-memory store recording everything the pipeline writes.
#[derive(Default)]
pub struct MemStore {
    events: Mutex<Vec<EventRecord>>,
    alerts: Mutex<Vec<Alert>>,
}

impl MemStore {
    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
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

    async fn insert_alert(&self, alert: &Alert) -> Result<u64> {
        let mut guard = self.alerts.lock().unwrap();
        guard.push(alert.clone());
        Ok(guard.len() as u64)
    }

    async fn events_since(
        &self,
        actor: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        let guard = self.events.lock().unwrap();
        Ok(guard
            .iter()
            .filter(|record| record.event.created_at >= since)
            .filter(|record| actor.map_or(true, |a| record.event.actor == a))
            .cloned()
            .collect())
    }
}

/// Store whose writes always fail, for exercising pipeline drop paths.
pub struct FailStore;

#[async_trait]
impl ActivityStore for FailStore {
    async fn insert_event(&self, _event: &FileEvent) -> Result<u64> {
        anyhow::bail!("simulated store failure")
    }

    async fn insert_alert(&self, _alert: &Alert) -> Result<u64> {
        anyhow::bail!("simulated store failure")
    }

    async fn events_since(
        &self,
        _actor: Option<&str>,
        _since: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        Ok(Vec::new())
    }
}

/// Store whose writes hang far longer than any pipeline timeout.
pub struct SlowStore;

#[async_trait]
impl ActivityStore for SlowStore {
    async fn insert_event(&self, _event: &FileEvent) -> Result<u64> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(1)
    }

    async fn insert_alert(&self, _alert: &Alert) -> Result<u64> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(1)
    }

    async fn events_since(
        &self,
        _actor: Option<&str>,
        _since: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        Ok(Vec::new())
    }
}
