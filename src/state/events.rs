//! Events reported back to the host application.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::storage::Entry;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FileSelected,
    FileDeleted,
    FileUploaded,
    FolderCreated,
    FileDownloaded,
    FileRenamed,
    FolderRenamed,
    FileChosen,
    FolderChosen,
}

/// What it happened to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Entry { entry: Entry },
    Path { path: String },
    Rename { from: String, to: String },
}

/// One user action, as reported to the host.
///
/// Every event gets a fresh id, so a host polling `last_event` can tell a
/// new action from the one it already handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub kind: EventKind,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            payload,
        }
    }

    pub fn for_entry(kind: EventKind, entry: Entry) -> Self {
        Self::new(kind, EventPayload::Entry { entry })
    }

    pub fn for_path(kind: EventKind, path: impl Into<String>) -> Self {
        Self::new(kind, EventPayload::Path { path: path.into() })
    }

    /// Path the event is about (the source path for renames).
    pub fn path(&self) -> &str {
        match &self.payload {
            EventPayload::Entry { entry } => &entry.path,
            EventPayload::Path { path } => path,
            EventPayload::Rename { from, .. } => from,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_json_shape() {
        let event = Event::for_path(EventKind::FileDeleted, "a/b.txt");
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["kind"], json!("file_deleted"));
        assert_eq!(value["payload"], json!({"type": "path", "path": "a/b.txt"}));
        assert_eq!(event.path(), "a/b.txt");
    }

    #[test]
    fn test_events_get_distinct_ids() {
        let a = Event::for_path(EventKind::FolderCreated, "x");
        let b = Event::for_path(EventKind::FolderCreated, "x");
        assert_ne!(a.id, b.id);
        assert_ne!(a, b);
    }

    #[test]
    fn test_rename_path_is_source() {
        let event = Event::new(
            EventKind::FileRenamed,
            EventPayload::Rename {
                from: "old.txt".to_string(),
                to: "new.txt".to_string(),
            },
        );
        assert_eq!(event.path(), "old.txt");
    }
}
