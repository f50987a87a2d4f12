//! Aggregate statistics over the event log
//!
//! Everything here is a full scan over the events tree. The store holds
//! monitoring data for a handful of users, not a telemetry firehose, so
//! scans are simpler and plenty fast at this scale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use vigil_core::event::EventType;

use crate::store::SledStore;
use crate::Result;

/// Coarse risk level used for the score distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub fn all() -> &'static [RiskLevel] {
        &[
            RiskLevel::VeryLow,
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::VeryHigh,
        ]
    }

    pub fn for_score(score: u8) -> Self {
        match score {
            0..=20 => RiskLevel::VeryLow,
            21..=40 => RiskLevel::Low,
            41..=60 => RiskLevel::Medium,
            61..=80 => RiskLevel::High,
            _ => RiskLevel::VeryHigh,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "Very Low",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::VeryHigh => "Very High",
        }
    }

    /// Inclusive score range covered by this level
    pub fn bounds(&self) -> (u8, u8) {
        match self {
            RiskLevel::VeryLow => (0, 20),
            RiskLevel::Low => (21, 40),
            RiskLevel::Medium => (41, 60),
            RiskLevel::High => (61, 80),
            RiskLevel::VeryHigh => (81, 100),
        }
    }
}

/// One bar of the risk distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBucket {
    pub level: RiskLevel,
    pub count: u64,
}

/// Score distribution plus alert totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSummary {
    pub distribution: Vec<RiskBucket>,
    pub total_alerts: u64,
    pub unresolved_alerts: u64,
}

/// Event count for one event type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeCount {
    pub event_type: EventType,
    pub count: u64,
}

/// Whole-log statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStats {
    pub total_events: u64,
    pub by_type: Vec<TypeCount>,
    pub average_risk: f64,
    pub high_risk_events: u64,
    pub external_drive_events: u64,
}

/// One hour of activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineBucket {
    pub hour: DateTime<Utc>,
    pub count: u64,
    pub average_risk: f64,
}

const HOUR_MS: i64 = 3_600_000;

impl SledStore {
    /// Score distribution across all stored events
    pub fn risk_summary(&self) -> Result<RiskSummary> {
        let mut counts: BTreeMap<u8, u64> = BTreeMap::new();
        for record in self.scan_events() {
            let record = record?;
            let level = RiskLevel::for_score(record.event.risk_score);
            *counts.entry(level as u8).or_default() += 1;
        }

        let distribution = RiskLevel::all()
            .iter()
            .map(|level| RiskBucket {
                level: *level,
                count: counts.get(&(*level as u8)).copied().unwrap_or(0),
            })
            .collect();

        Ok(RiskSummary {
            distribution,
            total_alerts: self.alert_count(),
            unresolved_alerts: self.unresolved_alert_count()?,
        })
    }

    /// Totals, per-type counts and averages across all stored events.
    ///
    /// `high_floor` is the display threshold for counting an event as
    /// high risk.
    pub fn event_stats(&self, high_floor: u8) -> Result<EventStats> {
        let mut total = 0u64;
        let mut risk_sum = 0u64;
        let mut high_risk = 0u64;
        let mut external = 0u64;
        let mut by_type: BTreeMap<&'static str, u64> = BTreeMap::new();

        for record in self.scan_events() {
            let record = record?;
            total += 1;
            risk_sum += u64::from(record.event.risk_score);
            if record.event.risk_score >= high_floor {
                high_risk += 1;
            }
            if record.event.is_external_drive {
                external += 1;
            }
            *by_type.entry(record.event.event_type.as_str()).or_default() += 1;
        }

        let by_type = EventType::all()
            .iter()
            .filter_map(|event_type| {
                by_type.get(event_type.as_str()).map(|count| TypeCount {
                    event_type: *event_type,
                    count: *count,
                })
            })
            .collect();

        let average_risk = if total == 0 {
            0.0
        } else {
            risk_sum as f64 / total as f64
        };

        Ok(EventStats {
            total_events: total,
            by_type,
            average_risk,
            high_risk_events: high_risk,
            external_drive_events: external,
        })
    }

    /// Hourly activity since the given time, oldest hour first
    pub fn hourly_timeline(&self, since: DateTime<Utc>) -> Result<Vec<TimelineBucket>> {
        // hour start millis -> (count, risk sum)
        let mut buckets: BTreeMap<i64, (u64, u64)> = BTreeMap::new();

        for record in self.scan_events() {
            let record = record?;
            if record.event.created_at < since {
                continue;
            }
            let ms = record.event.created_at.timestamp_millis();
            let hour_start = ms - ms.rem_euclid(HOUR_MS);
            let entry = buckets.entry(hour_start).or_default();
            entry.0 += 1;
            entry.1 += u64::from(record.event.risk_score);
        }

        let timeline = buckets
            .into_iter()
            .filter_map(|(hour_start, (count, risk_sum))| {
                let hour = DateTime::<Utc>::from_timestamp_millis(hour_start)?;
                Some(TimelineBucket {
                    hour,
                    count,
                    average_risk: risk_sum as f64 / count as f64,
                })
            })
            .collect();

        Ok(timeline)
    }
}
