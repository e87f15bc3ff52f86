//! Presentation state and frame computation.
//!
//! [`ViewState`] holds what the user has expanded and selected. [`compute`]
//! turns that state, a tree and the options into a [`Frame`] the host draws
//! as-is. Nothing here touches storage.

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::services::storage::size_display;
use crate::state::options::BrowserOptions;

use super::tree::TreeNode;

/// A user gesture delivered by the host.
///
/// Paths are relative to the browse root, as they appear in frame rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// Expand or collapse a folder.
    ToggleFolder { path: String },
    /// Click a file.
    SelectFile { path: String },
    ChooseFile { path: String },
    ChooseFolder { path: String },
    Delete { path: String },
    Upload {
        folder: String,
        name: String,
        data: Bytes,
        content_type: Option<String>,
    },
    NewFolder { parent: String, name: String },
    Download { path: String },
    Rename {
        from: String,
        to: String,
        is_folder: bool,
    },
}

impl Gesture {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Gesture::ToggleFolder { .. } => "toggle folder",
            Gesture::SelectFile { .. } => "select file",
            Gesture::ChooseFile { .. } => "choose file",
            Gesture::ChooseFolder { .. } => "choose folder",
            Gesture::Delete { .. } => "delete",
            Gesture::Upload { .. } => "upload",
            Gesture::NewFolder { .. } => "new folder",
            Gesture::Download { .. } => "download",
            Gesture::Rename { .. } => "rename",
        }
    }
}

/// Expanded folders and the selected file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub expanded: BTreeSet<String>,
    pub selected: Option<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a folder between collapsed and expanded.
    pub fn toggle(&mut self, path: &str) {
        if !self.expanded.remove(path) {
            self.expanded.insert(path.to_string());
        }
    }

    /// Select a file, replacing any previous selection.
    ///
    /// Ancestor folders are expanded so the selection stays visible.
    pub fn select(&mut self, path: &str) {
        let mut ancestor = String::new();
        let segments: Vec<&str> = path.split('/').collect();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            if !ancestor.is_empty() {
                ancestor.push('/');
            }
            ancestor.push_str(segment);
            self.expanded.insert(ancestor.clone());
        }
        self.selected = Some(path.to_string());
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Forget folders and selections that are no longer in `tree`.
    pub fn retain_existing(&mut self, tree: &TreeNode) {
        self.expanded.retain(|path| tree.find_folder(path).is_some());
        if let Some(selected) = &self.selected {
            if tree.find_file(selected).is_none() {
                self.selected = None;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    Download,
    Delete,
    Choose,
    Rename,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolbarAction {
    Upload,
    NewFolder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewPosition {
    Top,
    Bottom,
}

/// One visible line of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub depth: usize,
    pub name: String,
    pub path: String,
    pub is_folder: bool,
    pub expanded: bool,
    pub selected: bool,
    pub size: String,
    pub modified: Option<String>,
    pub actions: Vec<RowAction>,
}

/// Everything the host needs to draw one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Widget key from the options, for hosts running several browsers.
    pub key: Option<String>,
    pub bucket_id: String,
    pub root: String,
    pub rows: Vec<Row>,
    pub toolbar: Vec<ToolbarAction>,
    pub show_preview: bool,
    pub preview_position: PreviewPosition,
    /// Unrecognized options, passed through untouched.
    pub extra: Map<String, Value>,
}

/// Flatten the visible part of `tree` into a frame.
pub fn compute(state: &ViewState, tree: &TreeNode, options: &BrowserOptions) -> Frame {
    let mut rows = Vec::new();
    push_rows(&mut rows, state, tree, options, 0);

    let mut toolbar = Vec::new();
    if options.show_upload_file {
        toolbar.push(ToolbarAction::Upload);
    }
    if options.show_new_folder {
        toolbar.push(ToolbarAction::NewFolder);
    }

    Frame {
        key: options.key.clone(),
        bucket_id: options.bucket_id.clone(),
        root: options.root(),
        rows,
        toolbar,
        show_preview: options.show_preview,
        preview_position: if options.show_preview_top {
            PreviewPosition::Top
        } else {
            PreviewPosition::Bottom
        },
        extra: options.extra.clone(),
    }
}

fn push_rows(
    rows: &mut Vec<Row>,
    state: &ViewState,
    node: &TreeNode,
    options: &BrowserOptions,
    depth: usize,
) {
    for child in &node.children {
        let expanded = child.is_folder && state.expanded.contains(&child.path);
        rows.push(Row {
            depth,
            name: child.name.clone(),
            path: child.path.clone(),
            is_folder: child.is_folder,
            expanded,
            selected: !child.is_folder && state.selected.as_deref() == Some(child.path.as_str()),
            size: if child.is_folder {
                String::new()
            } else {
                size_display(child.size)
            },
            modified: child
                .last_modified
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
            actions: row_actions(child.is_folder, options),
        });
        if expanded {
            push_rows(rows, state, child, options, depth + 1);
        }
    }
}

fn row_actions(is_folder: bool, options: &BrowserOptions) -> Vec<RowAction> {
    let flags = if is_folder {
        [
            (false, RowAction::Download),
            (false, RowAction::Delete),
            (options.show_choose_folder, RowAction::Choose),
            (options.show_rename_folder, RowAction::Rename),
        ]
    } else {
        [
            (options.show_download_file, RowAction::Download),
            (options.show_delete_file, RowAction::Delete),
            (options.show_choose_file, RowAction::Choose),
            (options.show_rename_file, RowAction::Rename),
        ]
    };
    flags
        .into_iter()
        .filter_map(|(enabled, action)| enabled.then_some(action))
        .collect()
}
