//! Filter stage for listed entries.
//!
//! Steps run in a fixed order: glob allow patterns, ignore patterns, the
//! extension allow-list (files only), then offset and limit. Surviving
//! entries keep their listing order.

use anyhow::Result;

use super::glob::GlobList;
use super::types::Entry;

/// Compiled filter settings.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    patterns: GlobList,
    ignores: GlobList,
    extensions: Vec<String>,
    offset: usize,
    limit: Option<usize>,
}

impl EntryFilter {
    /// Create a filter keeping entries that match any of `patterns`.
    ///
    /// An empty pattern list keeps nothing.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        Ok(Self {
            patterns: GlobList::new(patterns)?,
            ..Default::default()
        })
    }

    /// Drop entries matching any of `ignores`.
    pub fn with_ignores<S: AsRef<str>>(mut self, ignores: &[S]) -> Result<Self> {
        self.ignores = GlobList::new(ignores)?;
        Ok(self)
    }

    /// Keep only files with one of `extensions`. Empty keeps every file.
    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    /// Skip the first `offset` surviving entries.
    pub fn with_offset(mut self, offset: Option<usize>) -> Self {
        self.offset = offset.unwrap_or(0);
        self
    }

    /// Keep at most `limit` entries.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Check the per-entry predicates (everything except offset and limit).
    pub fn accepts(&self, entry: &Entry) -> bool {
        self.patterns.is_match(&entry.path)
            && !self.ignores.is_match(&entry.path)
            && self.accepts_extension(entry)
    }

    fn accepts_extension(&self, entry: &Entry) -> bool {
        if entry.is_folder || self.extensions.is_empty() {
            return true;
        }
        let name = entry.name.to_lowercase();
        self.extensions
            .iter()
            .any(|ext| name.len() > ext.len() + 1 && name.ends_with(&format!(".{}", ext)))
    }

    /// Run the filter over a listing.
    pub fn apply(&self, entries: Vec<Entry>) -> Vec<Entry> {
        let before = entries.len();
        let filtered: Vec<Entry> = entries
            .into_iter()
            .filter(|entry| self.accepts(entry))
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();

        tracing::debug!("Filter kept {} of {} entries", filtered.len(), before);
        filtered
    }
}

/// `.TXT`, `txt` and ` .txt ` all mean the same extension.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
