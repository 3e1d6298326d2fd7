//! Notifications emitted by the studio.
//!
//! Listeners subscribe to an [`EventBus`]. The bus also keeps a short
//! backlog so a panel attached halfway through an export can show what it
//! missed.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ids::ExportId;

/// How many events the backlog holds before dropping the oldest.
const MAX_RECENT_EVENTS: usize = 100;

/// Coarse grouping used by listeners that only care about one area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Export,
    Playback,
    Timeline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    ExportStarted {
        export_id: ExportId,
    },
    /// `progress` is in `[0, 1]`; `stage` names the running render step.
    ExportProgress {
        export_id: ExportId,
        progress: f32,
        stage: String,
    },
    ExportCompleted {
        export_id: ExportId,
        bytes: u64,
        warnings: usize,
    },
    ExportFailed {
        export_id: ExportId,
        error: String,
    },
    ExportDismissed {
        export_id: ExportId,
    },
    PlaybackModeChanged {
        mode: String,
    },
    /// The segment list was edited; `segments` is the new count.
    TimelineChanged {
        segments: usize,
    },
}

impl EventPayload {
    pub fn category(&self) -> EventCategory {
        use EventPayload::*;
        match self {
            PlaybackModeChanged { .. } => EventCategory::Playback,
            TimelineChanged { .. } => EventCategory::Timeline,
            ExportStarted { .. }
            | ExportProgress { .. }
            | ExportCompleted { .. }
            | ExportFailed { .. }
            | ExportDismissed { .. } => EventCategory::Export,
        }
    }
}

/// One stamped notification as delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub category: EventCategory,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        let category = payload.category();
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            category,
            payload,
        }
    }
}

/// Fan-out of studio events plus a bounded backlog, newest at the front.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    backlog: RwLock<VecDeque<Event>>,
}

impl EventBus {
    /// `capacity` sizes the live channel; the backlog is fixed at
    /// [`MAX_RECENT_EVENTS`].
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            backlog: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn broadcast(&self, payload: EventPayload) {
        let event = Event::new(payload);
        let mut backlog = self.backlog.write();
        backlog.push_front(event.clone());
        backlog.truncate(MAX_RECENT_EVENTS);
        drop(backlog);

        // Err only means nobody is listening right now.
        let _ = self.tx.send(event);
    }

    /// Up to `n` backlog entries, newest first.
    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        self.backlog.read().iter().take(n).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
