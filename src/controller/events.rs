//! User-visible events about services.

use parking_lot::Mutex;
use serde::Serialize;

/// Severity of a service event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    Normal,
    Warning,
}

/// One recorded event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub service: String,
    pub kind: EventKind,
    pub reason: String,
    pub message: String,
}

/// Channel through which the controller reports on individual services
pub trait EventRecorder: Send + Sync {
    fn record(&self, event: Event);

    fn info(&self, service: &str, reason: &str, message: String) {
        self.record(Event {
            service: service.to_string(),
            kind: EventKind::Normal,
            reason: reason.to_string(),
            message,
        });
    }

    fn warn(&self, service: &str, reason: &str, message: String) {
        self.record(Event {
            service: service.to_string(),
            kind: EventKind::Warning,
            reason: reason.to_string(),
            message,
        });
    }
}

/// Writes events to the log and nowhere else
#[derive(Debug, Default)]
pub struct LogRecorder;

impl EventRecorder for LogRecorder {
    fn record(&self, event: Event) {
        match event.kind {
            EventKind::Normal => {
                log::info!("{} {}: {}", event.service, event.reason, event.message)
            }
            EventKind::Warning => {
                log::warn!("{} {}: {}", event.service, event.reason, event.message)
            }
        }
    }
}

/// Keeps events in memory for later inspection
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<Event>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn warnings(&self) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == EventKind::Warning)
            .cloned()
            .collect()
    }

    /// Events for one service, oldest first
    pub fn for_service(&self, service: &str) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.service == service)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, event: Event) {
        LogRecorder.record(event.clone());
        self.events.lock().push(event);
    }
}
