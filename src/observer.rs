//! Observer / audit sink
//!
//! Observers receive a copy of every forwarded instruction plus derived transition
//! events (frame pushed/popped, state advanced), synchronously and in forwarding
//! order. Storage and formatting are entirely the observer's concern; the bundled
//! `EventLog` keeps a timestamped append-only record and can dump it to a file.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::instruction::Instruction;

/// Events emitted by the engine as it drives the frame stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// An instruction was forwarded to the runner.
    InstructionForwarded { instruction: Instruction },
    /// The active frame advanced to a new state.
    StateAdvanced { state: String, depth: usize },
    /// A sub-machine frame was pushed; `depth` is the stack depth after the push.
    FramePushed { depth: usize },
    /// A frame was popped; `depth` is the stack depth after the pop.
    FramePopped { depth: usize },
    /// The root frame completed and the stack is empty.
    RunCompleted,
    /// The engine moved to the failed state.
    RunFailed { error: String },
}

/// Synchronous callback invoked for every engine event.
pub trait EngineObserver {
    fn on_event(&mut self, event: &EngineEvent);
}

/// One recorded event with its capture time.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: EngineEvent,
}

/// Append-only event log behind a cheaply clonable handle.
///
/// Clone it before handing it to the engine; all clones share the same record.
/// Single-threaded by design, like the engine itself.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Rc<RefCell<Vec<LoggedEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Copy of the recorded events, in capture order.
    pub fn snapshot(&self) -> Vec<LoggedEvent> {
        self.entries.borrow().clone()
    }

    /// Events without timestamps, convenient for assertions.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.entries.borrow().iter().map(|e| e.event.clone()).collect()
    }

    /// Write the log as JSON lines.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut file = File::create(path)?;
        for entry in self.entries.borrow().iter() {
            let line = serde_json::to_string(entry)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}

impl EngineObserver for EventLog {
    fn on_event(&mut self, event: &EngineEvent) {
        self.entries.borrow_mut().push(LoggedEvent {
            at: Utc::now(),
            event: event.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_same_record() {
        let log = EventLog::new();
        let mut sink: Box<dyn EngineObserver> = Box::new(log.clone());

        sink.on_event(&EngineEvent::RunCompleted);
        sink.on_event(&EngineEvent::FramePopped { depth: 0 });

        assert_eq!(
            log.events(),
            vec![EngineEvent::RunCompleted, EngineEvent::FramePopped { depth: 0 }]
        );
    }

    #[test]
    fn test_logged_event_serializes_flat() {
        let entry = LoggedEvent {
            at: Utc::now(),
            event: EngineEvent::StateAdvanced {
                state: "review".into(),
                depth: 1,
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"], "state_advanced");
        assert_eq!(json["state"], "review");
        assert!(json["at"].is_string());
    }
}
