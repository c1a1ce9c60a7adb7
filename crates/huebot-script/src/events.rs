//! Run events
//!
//! Observers see what a run does as it happens: loop iterations, dispatches,
//! pauses, and the final status.

use crate::result::RunStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

/// Something that happened during a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Started {
        run_id: String,
        program: String,
    },
    /// A serial iteration is starting
    Serial {
        path: String,
        iteration: u64,
        mode: &'static str,
    },
    /// A parallel iteration is starting
    Parallel {
        path: String,
        iteration: u64,
        mode: &'static str,
    },
    /// A transition is dispatching to resolved devices
    Transition {
        path: String,
        devices: Vec<String>,
    },
    /// One device apply finished
    Applied {
        path: String,
        device: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Paused {
        path: String,
        seconds: f64,
    },
    Stopped {
        run_id: String,
        status: RunStatus,
    },
}

impl RunEvent {
    /// Event type name
    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::Started { .. } => "started",
            RunEvent::Serial { .. } => "serial",
            RunEvent::Parallel { .. } => "parallel",
            RunEvent::Transition { .. } => "transition",
            RunEvent::Applied { .. } => "applied",
            RunEvent::Paused { .. } => "paused",
            RunEvent::Stopped { .. } => "stopped",
        }
    }
}

/// Receives run events
///
/// Called inline from the interpreter, possibly from concurrent branches.
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl RunObserver for NullObserver {
    fn on_event(&self, _event: &RunEvent) {}
}

/// Keeps every event with the time it was seen
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<(DateTime<Utc>, RunEvent)>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far
    pub fn events(&self) -> Vec<(DateTime<Utc>, RunEvent)> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Event type names, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, event)| event.name())
            .collect()
    }
}

impl RunObserver for CollectingObserver {
    fn on_event(&self, event: &RunEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((Utc::now(), event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_json() {
        let event = RunEvent::Applied {
            path: "serial.steps[0].transition".into(),
            device: "light:Desk".into(),
            error: None,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "applied",
                "path": "serial.steps[0].transition",
                "device": "light:Desk"
            })
        );

        let event = RunEvent::Stopped {
            run_id: "01J".into(),
            status: RunStatus::Cancelled,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "stopped", "run_id": "01J", "status": "cancelled"})
        );
    }

    #[test]
    fn test_collecting_observer() {
        let observer = CollectingObserver::new();
        observer.on_event(&RunEvent::Paused {
            path: "serial".into(),
            seconds: 1.0,
        });
        observer.on_event(&RunEvent::Stopped {
            run_id: "01J".into(),
            status: RunStatus::Completed,
        });
        assert_eq!(observer.names(), vec!["paused", "stopped"]);
        assert_eq!(observer.events().len(), 2);
    }
}
