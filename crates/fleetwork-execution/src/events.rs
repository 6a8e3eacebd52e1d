//! Event recording
//!
//! Events are fire-and-forget. Recording never blocks the reconcile and
//! never fails it; a full or unsubscribed channel just drops the event.

use fleetwork_types::{EventType, ObjectReference, WorkEvent};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

/// Channel capacity for the event stream
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Sink for human-readable events about Works and their workloads
pub trait EventRecorder: Send + Sync {
    fn event(&self, object: &ObjectReference, event_type: EventType, reason: &str, message: String);
}

/// Publishes events on a broadcast channel
pub struct BroadcastEventRecorder {
    source: String,
    tx: broadcast::Sender<WorkEvent>,
}

impl BroadcastEventRecorder {
    pub fn new(source: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            source: source.into(),
            tx,
        }
    }

    /// Subscribe to recorded events
    pub fn subscribe(&self) -> broadcast::Receiver<WorkEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventRecorder for BroadcastEventRecorder {
    fn event(&self, object: &ObjectReference, event_type: EventType, reason: &str, message: String) {
        debug!(
            object = %object,
            event_type = %event_type,
            reason,
            message = %message,
            "Recording event"
        );
        let event = WorkEvent::new(&self.source, object.clone(), event_type, reason, message);
        // No subscribers is fine
        let _ = self.tx.send(event);
    }
}

/// Keeps every event in memory, in order
#[derive(Default, Clone)]
pub struct CollectingEventRecorder {
    events: Arc<Mutex<Vec<WorkEvent>>>,
}

impl CollectingEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WorkEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events with the given reason
    pub fn with_reason(&self, reason: &str) -> Vec<WorkEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.reason == reason)
            .collect()
    }
}

impl EventRecorder for CollectingEventRecorder {
    fn event(&self, object: &ObjectReference, event_type: EventType, reason: &str, message: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(WorkEvent::new("collector", object.clone(), event_type, reason, message));
        }
    }
}
