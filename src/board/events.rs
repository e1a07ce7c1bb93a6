//! Fire-and-forget notifications emitted after a successful board change.
//!
//! Sinks cannot fail the operation that emitted the event and get no say in
//! its outcome.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use super::storage::append_activity;
use super::{CardId, ColumnId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    CardCreated { id: CardId, title: String, column: ColumnId },
    CardUpdated { id: CardId, title: String },
    CardMoved { id: CardId, title: String, from: ColumnId, to: ColumnId },
    Reordered { id: CardId, title: String, column: ColumnId },
    Archived { id: CardId, title: String, archived: bool },
    Parked { id: CardId, title: String, overflowed: bool },
    Deleted { id: CardId, title: String },
    TimerStarted { id: CardId, title: String },
    TimerStopped { id: CardId, title: String, credited: u64 },
    /// A card entered the done column from another column.
    Celebrate { id: CardId, title: String },
    CapacityRejected { limit: usize },
    ColumnCreated { id: ColumnId, title: String },
    ColumnUpdated { id: ColumnId, title: String },
}

impl BoardEvent {
    /// Short verb used as the activity-log `action`.
    pub fn action(&self) -> &'static str {
        match self {
            Self::CardCreated { .. } => "create",
            Self::CardUpdated { .. } => "edit",
            Self::CardMoved { .. } => "move",
            Self::Reordered { .. } => "reorder",
            Self::Archived { archived: true, .. } => "archive",
            Self::Archived { archived: false, .. } => "unarchive",
            Self::Parked { overflowed: true, .. } => "park",
            Self::Parked { overflowed: false, .. } => "unpark",
            Self::Deleted { .. } => "delete",
            Self::TimerStarted { .. } => "timer-start",
            Self::TimerStopped { .. } => "timer-stop",
            Self::Celebrate { .. } => "done",
            Self::CapacityRejected { .. } => "capacity-rejected",
            Self::ColumnCreated { .. } => "column-create",
            Self::ColumnUpdated { .. } => "column-update",
        }
    }

    /// The `(id, title)` the event is about. Empty for board-wide events.
    pub fn subject(&self) -> (&str, &str) {
        match self {
            Self::CardCreated { id, title, .. }
            | Self::CardUpdated { id, title }
            | Self::CardMoved { id, title, .. }
            | Self::Reordered { id, title, .. }
            | Self::Archived { id, title, .. }
            | Self::Parked { id, title, .. }
            | Self::Deleted { id, title }
            | Self::TimerStarted { id, title }
            | Self::TimerStopped { id, title, .. }
            | Self::Celebrate { id, title } => (id.as_str(), title.as_str()),
            Self::ColumnCreated { id, title } | Self::ColumnUpdated { id, title } => {
                (id.as_str(), title.as_str())
            }
            Self::CapacityRejected { .. } => ("", ""),
        }
    }

    fn extras(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::CardCreated { column, .. } | Self::Reordered { column, .. } => {
                vec![("column", column.to_string())]
            }
            Self::CardMoved { from, to, .. } => {
                vec![("from", from.to_string()), ("to", to.to_string())]
            }
            Self::TimerStopped { credited, .. } => vec![("credited", credited.to_string())],
            Self::CapacityRejected { limit } => vec![("limit", limit.to_string())],
            _ => Vec::new(),
        }
    }
}

/// Receives board events.
pub trait EventSink {
    fn emit(&mut self, at: DateTime<Utc>, event: &BoardEvent);
}

/// Appends every event to `.focusboard/activity.log`.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    board_dir: PathBuf,
}

impl ActivityLog {
    pub fn new(board_dir: impl Into<PathBuf>) -> Self {
        Self { board_dir: board_dir.into() }
    }
}

impl EventSink for ActivityLog {
    fn emit(&mut self, at: DateTime<Utc>, event: &BoardEvent) {
        let (id, title) = event.subject();
        append_activity(&self.board_dir, at, event.action(), id, title, &event.extras());
    }
}

/// Keeps events in memory until drained. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct EventBuffer(Rc<RefCell<Vec<BoardEvent>>>);

impl EventBuffer {
    pub fn drain(&self) -> Vec<BoardEvent> {
        self.0.borrow_mut().drain(..).collect()
    }
}

impl EventSink for EventBuffer {
    fn emit(&mut self, _at: DateTime<Utc>, event: &BoardEvent) {
        self.0.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn buffer_clones_share_events() {
        let buffer = EventBuffer::default();
        let mut sink = buffer.clone();
        sink.emit(Utc::now(), &BoardEvent::CapacityRejected { limit: 5 });
        assert_eq!(buffer.drain(), vec![BoardEvent::CapacityRejected { limit: 5 }]);
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn activity_log_writes_action_and_extras() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ActivityLog::new(dir.path());
        log.emit(
            Utc::now(),
            &BoardEvent::CardMoved {
                id: "4".into(),
                title: "Ship it".into(),
                from: "todo".into(),
                to: "done".into(),
            },
        );
        let line = std::fs::read_to_string(dir.path().join("activity.log")).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["action"], "move");
        assert_eq!(value["id"], "4");
        assert_eq!(value["to"], "done");
    }

    #[test]
    fn log_failure_is_swallowed() {
        let mut log = ActivityLog::new("/nonexistent/focusboard/dir");
        log.emit(Utc::now(), &BoardEvent::Deleted { id: "1".into(), title: "x".into() });
    }

    #[test]
    fn archive_action_follows_flag() {
        let event = |archived| BoardEvent::Archived { id: "1".into(), title: "t".into(), archived };
        assert_eq!(event(true).action(), "archive");
        assert_eq!(event(false).action(), "unarchive");
    }
}
