//! Listing adapter.
//!
//! Lists everything under the browse root through the storage client and
//! rebases the results so entry paths are relative to that root. Client
//! errors are passed through untouched.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::traits::StorageClient;
use super::types::{Entry, clean_path};

/// Field a listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    Size,
    UpdatedAt,
}

/// Requested listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub by: SortKey,
    #[serde(default)]
    pub descending: bool,
}

impl SortOrder {
    fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        let ordering = match self.by {
            SortKey::Name => a.path.to_lowercase().cmp(&b.path.to_lowercase()),
            SortKey::Size => a.size.cmp(&b.size),
            SortKey::UpdatedAt => a.last_modified.cmp(&b.last_modified),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// List the entries under `root`, with paths relative to it.
///
/// Without a sort order the client's order is kept as is.
pub async fn list_entries(
    client: &dyn StorageClient,
    root: &str,
    sort: Option<SortOrder>,
) -> Result<Vec<Entry>> {
    let root = clean_path(root);
    let raw = client.list(&root).await?;

    let mut entries: Vec<Entry> = raw
        .into_iter()
        .filter_map(|entry| rebase(entry, &root))
        .collect();

    if let Some(order) = sort {
        // Stable, so ties keep listing order
        entries.sort_by(|a, b| order.compare(a, b));
    }

    tracing::debug!(
        "Listed {} entries under {:?} in bucket {}",
        entries.len(),
        root,
        client.bucket_id()
    );
    Ok(entries)
}

/// Make `entry.path` relative to `root`. Entries outside the root, and the
/// root marker itself, are dropped.
fn rebase(mut entry: Entry, root: &str) -> Option<Entry> {
    let path = clean_path(&entry.path);
    let relative = if root.is_empty() {
        path
    } else {
        path.strip_prefix(root)?.strip_prefix('/')?.to_string()
    };

    if relative.is_empty() {
        return None;
    }
    entry.path = relative;
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::testing::RecordingClient;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_rebase_relative_to_root() {
        let client = RecordingClient::with_entries(vec![
            Entry::folder("docs"),
            Entry::file("docs/a.txt", 1),
            Entry::file("docs/sub/b.txt", 2),
            Entry::file("docsy/c.txt", 3),
            Entry::file("other.txt", 4),
        ]);

        let entries = smol::block_on(list_entries(&client, "/docs/", None)).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "sub/b.txt"]);
        assert_eq!(entries[1].name, "b.txt");
        assert_eq!(client.calls(), vec!["list docs"]);
    }

    #[test]
    fn test_root_keeps_client_order() {
        let client = RecordingClient::with_entries(vec![
            Entry::file("z.txt", 1),
            Entry::file("a.txt", 2),
        ]);

        let entries = smol::block_on(list_entries(&client, "", None)).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["z.txt", "a.txt"]);
    }

    #[test]
    fn test_sort_orders() {
        let old = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let client = RecordingClient::with_entries(vec![
            Entry::file("b.txt", 30).with_last_modified(old),
            Entry::file("A.txt", 10).with_last_modified(new),
            Entry::file("c.txt", 20),
        ]);

        let by = |by, descending| {
            let order = SortOrder { by, descending };
            let entries = smol::block_on(list_entries(&client, "", Some(order))).unwrap();
            entries.into_iter().map(|e| e.path).collect::<Vec<_>>()
        };

        assert_eq!(by(SortKey::Name, false), vec!["A.txt", "b.txt", "c.txt"]);
        assert_eq!(by(SortKey::Size, true), vec!["b.txt", "c.txt", "A.txt"]);
        // Missing timestamps sort first
        assert_eq!(by(SortKey::UpdatedAt, false), vec!["c.txt", "b.txt", "A.txt"]);
    }

    #[test]
    fn test_client_error_propagates() {
        let client = RecordingClient::default();
        client.fail_next("bucket not found");

        let err = smol::block_on(list_entries(&client, "", None)).unwrap_err();
        assert_eq!(err.to_string(), "bucket not found");
    }
}
