//! Browser session.
//!
//! A [`BrowserSession`] is one mounted browser. Each call to
//! [`BrowserSession::render`] runs a full cycle: dispatch the gesture's
//! storage action, load the listing (or the cached snapshot), update the view
//! state, build the preview and compute the frame.

use anyhow::{Result, anyhow, bail};
use bytes::Bytes;
use std::sync::Arc;
use uuid::Uuid;

use crate::services::storage::{Entry, SharedStorageClient, join_path, list_entries};
use crate::workspace::preview::{Preview, load_preview};
use crate::workspace::tree::TreeNode;
use crate::workspace::view::{Frame, Gesture, ViewState, compute};

use super::browser_actions::{Action, ActionDispatcher};
use super::cache::{CacheKey, Snapshot, TreeCache};
use super::events::{Event, EventKind};
use super::options::BrowserOptions;

/// Output of one render cycle.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub frame: Frame,
    pub tree: Arc<TreeNode>,
    /// Event produced by this cycle's gesture, if any.
    pub event: Option<Event>,
    /// Preview of the selected file.
    pub preview: Option<Preview>,
    /// Contents fetched by a download gesture.
    pub download: Option<Bytes>,
}

pub struct BrowserSession {
    id: Uuid,
    client: SharedStorageClient,
    options: BrowserOptions,
    view: ViewState,
    cache: TreeCache,
    last_event: Option<Event>,
}

impl BrowserSession {
    pub fn new(client: SharedStorageClient, mut options: BrowserOptions) -> Self {
        if options.bucket_id.is_empty() {
            options.bucket_id = client.bucket_id().to_string();
        }
        let id = Uuid::new_v4();
        tracing::debug!("Browser session {} on bucket {}", id, options.bucket_id);
        Self {
            id,
            client,
            options,
            view: ViewState::new(),
            cache: TreeCache::new(),
            last_event: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.id
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }

    /// Replace the options for the next render.
    ///
    /// The cached tree survives as long as the root and filters do.
    pub fn set_options(&mut self, mut options: BrowserOptions) {
        if options.bucket_id.is_empty() {
            options.bucket_id = self.client.bucket_id().to_string();
        }
        self.options = options;
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    /// Most recent event of this session.
    pub fn last_event(&self) -> Option<&Event> {
        self.last_event.as_ref()
    }

    /// Run one render cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the gesture is disabled by the options, refers to
    /// a path that is not in the listing, or a storage call fails.
    pub async fn render(&mut self, gesture: Option<Gesture>) -> Result<RenderOutput> {
        let mut event = None;
        let mut download = None;

        if let Some(gesture) = &gesture {
            self.check_enabled(gesture)?;
            if let Some(action) = to_action(gesture) {
                let dispatcher = ActionDispatcher::new(self.client.clone(), self.options.root());
                let dispatched = dispatcher.dispatch(&action).await?;
                if action.is_mutating() {
                    self.cache.invalidate();
                }
                // Recorded before the reload so a failed listing keeps it.
                self.last_event = Some(dispatched.event.clone());
                event = Some(dispatched.event);
                download = dispatched.download;
            }
        }

        let snapshot = self.snapshot().await?;
        self.view.retain_existing(&snapshot.tree);

        if let Some(gesture) = &gesture {
            if let Some(presented) = self.present(gesture, &snapshot)? {
                self.last_event = Some(presented.clone());
                event = Some(presented);
            }
        }

        let preview = self.preview().await?;
        let frame = compute(&self.view, &snapshot.tree, &self.options);

        Ok(RenderOutput {
            frame,
            tree: snapshot.tree.clone(),
            event,
            preview,
            download,
        })
    }

    /// Reject gestures whose button is hidden.
    fn check_enabled(&self, gesture: &Gesture) -> Result<()> {
        let o = &self.options;
        let enabled = match gesture {
            Gesture::ToggleFolder { .. } | Gesture::SelectFile { .. } => true,
            Gesture::ChooseFile { .. } => o.show_choose_file,
            Gesture::ChooseFolder { .. } => o.show_choose_folder,
            Gesture::Delete { .. } => o.show_delete_file,
            Gesture::Upload { .. } => o.show_upload_file,
            Gesture::NewFolder { .. } => o.show_new_folder,
            Gesture::Download { .. } => o.show_download_file,
            Gesture::Rename { is_folder, .. } => {
                if *is_folder {
                    o.show_rename_folder
                } else {
                    o.show_rename_file
                }
            }
        };
        if !enabled {
            bail!("invalid configuration: {} is disabled", gesture.name());
        }
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<Arc<Snapshot>> {
        let key = CacheKey {
            root: self.options.root(),
            fingerprint: self.options.listing_fingerprint(),
        };

        if self.options.use_cache {
            if let Some(snapshot) = self.cache.get(&key) {
                tracing::debug!("Using cached tree for {:?}", key.root);
                return Ok(snapshot);
            }
        }

        let entries = list_entries(self.client.as_ref(), &key.root, self.options.sort).await?;
        let entries = self.options.entry_filter()?.apply(entries);
        let snapshot = Arc::new(Snapshot::new(entries));

        if self.options.use_cache {
            self.cache.insert(key, snapshot.clone());
        }
        Ok(snapshot)
    }

    /// Apply view gestures and return the event they produce.
    fn present(&mut self, gesture: &Gesture, snapshot: &Snapshot) -> Result<Option<Event>> {
        let event = match gesture {
            Gesture::ToggleFolder { path } => {
                folder_at(snapshot, path)?;
                self.view.toggle(path);
                None
            }
            Gesture::SelectFile { path } => {
                let entry = file_at(snapshot, path)?;
                self.view.select(path);
                (!self.options.ignore_file_select_event)
                    .then(|| Event::for_entry(EventKind::FileSelected, entry))
            }
            Gesture::ChooseFile { path } => {
                let entry = file_at(snapshot, path)?;
                Some(Event::for_entry(EventKind::FileChosen, entry))
            }
            Gesture::ChooseFolder { path } => {
                folder_at(snapshot, path)?;
                Some(Event::for_path(EventKind::FolderChosen, path.as_str()))
            }
            _ => None,
        };
        Ok(event)
    }

    async fn preview(&self) -> Result<Option<Preview>> {
        let Some(path) = &self.view.selected else {
            return Ok(None);
        };
        // Previews follow select events.
        if !self.options.show_preview
            || self.options.ignore_file_select_event
            || self.options.is_preview_ignored(path)
        {
            return Ok(None);
        }

        let key = join_path(&self.options.root(), path);
        if !self.client.exists(&key).await? {
            return Ok(Some(Preview::not_found(path)));
        }
        let preview = load_preview(
            self.client.as_ref(),
            &key,
            path,
            &self.options.preview_overrides,
        )
        .await;
        Ok(Some(preview))
    }
}

fn to_action(gesture: &Gesture) -> Option<Action> {
    let action = match gesture.clone() {
        Gesture::Delete { path } => Action::Delete { path },
        Gesture::Upload {
            folder,
            name,
            data,
            content_type,
        } => Action::Upload {
            folder,
            name,
            data,
            content_type,
        },
        Gesture::NewFolder { parent, name } => Action::CreateFolder { parent, name },
        Gesture::Download { path } => Action::Download { path },
        Gesture::Rename {
            from,
            to,
            is_folder,
        } => Action::Rename {
            from,
            to,
            is_folder,
        },
        _ => return None,
    };
    Some(action)
}

fn file_at(snapshot: &Snapshot, path: &str) -> Result<Entry> {
    snapshot
        .entry(path)
        .filter(|entry| !entry.is_folder)
        .cloned()
        .ok_or_else(|| anyhow!("No such file in listing: {}", path))
}

fn folder_at(snapshot: &Snapshot, path: &str) -> Result<()> {
    if snapshot.tree.find_folder(path).is_none() {
        bail!("No such folder in listing: {}", path);
    }
    Ok(())
}
