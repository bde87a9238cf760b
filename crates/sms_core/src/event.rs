use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Success,
    Error,
    Waiting,
    Info,
}

/// Wall-clock millis plus a per-run sequence number, unique within a run
/// even when several events share a clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId {
    pub millis: i64,
    pub seq: u64,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

impl Serialize for EventId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One entry of the run's append-only progress log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub id: EventId,
    pub message: String,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

/// Hands out progress events with strictly increasing ids.
#[derive(Debug, Clone, Default)]
pub struct EventStamper {
    next_seq: u64,
}

impl EventStamper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(
        &mut self,
        now: DateTime<Utc>,
        kind: EventKind,
        message: impl Into<String>,
    ) -> ProgressEvent {
        let seq = self.next_seq;
        self.next_seq += 1;
        ProgressEvent {
            id: EventId {
                millis: now.timestamp_millis(),
                seq,
            },
            message: message.into(),
            kind,
            timestamp: now,
        }
    }
}
