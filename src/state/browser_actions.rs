//! Storage actions triggered from the browser.
//!
//! Each action issues exactly one client call and reports one event.

use anyhow::{Context, Result};
use bytes::Bytes;

use crate::services::storage::{SharedStorageClient, join_path};

use super::events::{Event, EventKind, EventPayload};

/// A storage-mutating or storage-reading action.
///
/// Paths are relative to the browse root.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Delete {
        path: String,
    },
    Upload {
        folder: String,
        name: String,
        data: Bytes,
        content_type: Option<String>,
    },
    CreateFolder {
        parent: String,
        name: String,
    },
    Download {
        path: String,
    },
    Rename {
        from: String,
        to: String,
        is_folder: bool,
    },
}

impl Action {
    /// Whether the action changes bucket contents.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Action::Download { .. })
    }
}

/// Result of a dispatched action.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub event: Event,
    /// Downloaded contents, for download actions.
    pub download: Option<Bytes>,
}

/// Runs actions against a storage client under a browse root.
#[derive(Clone)]
pub struct ActionDispatcher {
    client: SharedStorageClient,
    root: String,
}

impl ActionDispatcher {
    pub fn new(client: SharedStorageClient, root: impl Into<String>) -> Self {
        Self {
            client,
            root: root.into(),
        }
    }

    /// Bucket key for a root-relative path.
    fn key(&self, path: &str) -> String {
        join_path(&self.root, path)
    }

    /// Run `action` and report what happened.
    pub async fn dispatch(&self, action: &Action) -> Result<Dispatched> {
        let result = self.run(action).await;
        match &result {
            Ok(dispatched) => tracing::info!(
                "{:?} on {} in bucket {}",
                dispatched.event.kind,
                dispatched.event.path(),
                self.client.bucket_id()
            ),
            Err(e) => tracing::error!("Storage action failed: {:#}", e),
        }
        result
    }

    async fn run(&self, action: &Action) -> Result<Dispatched> {
        match action {
            Action::Delete { path } => {
                self.client
                    .delete(&self.key(path))
                    .await
                    .with_context(|| format!("Failed to delete {}", path))?;
                Ok(Dispatched {
                    event: Event::for_path(EventKind::FileDeleted, path.as_str()),
                    download: None,
                })
            }
            Action::Upload {
                folder,
                name,
                data,
                content_type,
            } => {
                let path = join_path(folder, name);
                self.client
                    .upload(&self.key(&path), data.clone(), content_type.as_deref())
                    .await
                    .with_context(|| format!("Failed to upload {}", path))?;
                Ok(Dispatched {
                    event: Event::for_path(EventKind::FileUploaded, path),
                    download: None,
                })
            }
            Action::CreateFolder { parent, name } => {
                let path = join_path(parent, name);
                self.client
                    .create_folder(&self.key(&path))
                    .await
                    .with_context(|| format!("Failed to create folder {}", path))?;
                Ok(Dispatched {
                    event: Event::for_path(EventKind::FolderCreated, path),
                    download: None,
                })
            }
            Action::Download { path } => {
                let data = self
                    .client
                    .download(&self.key(path))
                    .await
                    .with_context(|| format!("Failed to download {}", path))?;
                Ok(Dispatched {
                    event: Event::for_path(EventKind::FileDownloaded, path.as_str()),
                    download: Some(data),
                })
            }
            Action::Rename {
                from,
                to,
                is_folder,
            } => {
                self.client
                    .rename(&self.key(from), &self.key(to))
                    .await
                    .with_context(|| format!("Failed to rename {} to {}", from, to))?;
                let kind = if *is_folder {
                    EventKind::FolderRenamed
                } else {
                    EventKind::FileRenamed
                };
                Ok(Dispatched {
                    event: Event::new(
                        kind,
                        EventPayload::Rename {
                            from: from.clone(),
                            to: to.clone(),
                        },
                    ),
                    download: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::testing::RecordingClient;
    use std::sync::Arc;

    fn dispatcher(client: &Arc<RecordingClient>, root: &str) -> ActionDispatcher {
        ActionDispatcher::new(client.clone(), root)
    }

    #[test]
    fn test_delete_emits_one_event_and_one_call() {
        smol::block_on(async {
            let client = Arc::new(RecordingClient::with_paths(&["a/b.txt", "d.txt"]));
            let dispatched = dispatcher(&client, "")
                .dispatch(&Action::Delete {
                    path: "a/b.txt".to_string(),
                })
                .await
                .unwrap();

            assert_eq!(dispatched.event.kind, EventKind::FileDeleted);
            assert_eq!(
                dispatched.event.payload,
                EventPayload::Path {
                    path: "a/b.txt".to_string()
                }
            );
            assert_eq!(client.calls(), vec!["delete a/b.txt"]);
            assert_eq!(client.paths(), vec!["d.txt"]);
        });
    }

    #[test]
    fn test_paths_are_resolved_under_root() {
        smol::block_on(async {
            let client = Arc::new(RecordingClient::default());
            let dispatched = dispatcher(&client, "/users/42/")
                .dispatch(&Action::Upload {
                    folder: "docs".to_string(),
                    name: "cv.pdf".to_string(),
                    data: Bytes::from_static(b"%PDF-1.7"),
                    content_type: Some("application/pdf".to_string()),
                })
                .await
                .unwrap();

            assert_eq!(dispatched.event.kind, EventKind::FileUploaded);
            assert_eq!(dispatched.event.path(), "docs/cv.pdf");
            assert_eq!(client.calls(), vec!["upload users/42/docs/cv.pdf"]);
        });
    }

    #[test]
    fn test_create_folder_at_root() {
        smol::block_on(async {
            let client = Arc::new(RecordingClient::default());
            let dispatched = dispatcher(&client, "")
                .dispatch(&Action::CreateFolder {
                    parent: String::new(),
                    name: "reports".to_string(),
                })
                .await
                .unwrap();

            assert_eq!(dispatched.event.kind, EventKind::FolderCreated);
            assert_eq!(client.calls(), vec!["create_folder reports"]);
        });
    }

    #[test]
    fn test_download_returns_contents() {
        smol::block_on(async {
            let client = Arc::new(RecordingClient::default());
            client.put("notes.txt", b"hello");

            let dispatched = dispatcher(&client, "")
                .dispatch(&Action::Download {
                    path: "notes.txt".to_string(),
                })
                .await
                .unwrap();

            assert_eq!(dispatched.event.kind, EventKind::FileDownloaded);
            assert_eq!(dispatched.download, Some(Bytes::from_static(b"hello")));
            assert_eq!(client.count("download"), 1);
        });
    }

    #[test]
    fn test_rename_event_depends_on_entry_kind() {
        smol::block_on(async {
            let client = Arc::new(RecordingClient::with_paths(&["old.txt"]));
            let dispatched = dispatcher(&client, "")
                .dispatch(&Action::Rename {
                    from: "old.txt".to_string(),
                    to: "new.txt".to_string(),
                    is_folder: false,
                })
                .await
                .unwrap();

            assert_eq!(dispatched.event.kind, EventKind::FileRenamed);
            assert_eq!(client.calls(), vec!["rename old.txt -> new.txt"]);
            assert_eq!(client.paths(), vec!["new.txt"]);
        });
    }

    #[test]
    fn test_client_failure_is_returned_with_context() {
        smol::block_on(async {
            let client = Arc::new(RecordingClient::with_paths(&["a.txt"]));
            client.fail_next("permission denied");

            let err = dispatcher(&client, "")
                .dispatch(&Action::Delete {
                    path: "a.txt".to_string(),
                })
                .await
                .unwrap_err();

            let message = format!("{:#}", err);
            assert!(message.contains("Failed to delete a.txt"));
            assert!(message.contains("permission denied"));
            assert_eq!(client.paths(), vec!["a.txt"]);
        });
    }

    #[test]
    fn test_only_download_is_read_only() {
        assert!(!Action::Download { path: "a".into() }.is_mutating());
        assert!(Action::Delete { path: "a".into() }.is_mutating());
    }
}
