//! In-process storage client for tests.
//!
//! Keeps a flat bucket in memory and records every call so tests can assert
//! exactly which client operations a gesture triggered.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

use super::traits::StorageClient;
use super::types::{Entry, clean_path};

#[derive(Default)]
pub(crate) struct RecordingClient {
    entries: Mutex<Vec<Entry>>,
    data: Mutex<HashMap<String, Bytes>>,
    calls: Mutex<Vec<String>>,
    /// Operation the failure is armed for (any if `None`) and its message.
    failure: Mutex<Option<(Option<String>, String)>>,
}

impl RecordingClient {
    pub(crate) fn with_entries(entries: Vec<Entry>) -> Self {
        let client = Self::default();
        *client.entries.lock().unwrap() = entries;
        client
    }

    pub(crate) fn with_paths(paths: &[&str]) -> Self {
        Self::with_entries(paths.iter().map(|p| Entry::file(*p, 1)).collect())
    }

    /// Store contents for an existing or new file.
    pub(crate) fn put(&self, path: &str, data: &'static [u8]) {
        let path = clean_path(path);
        let mut entries = self.entries.lock().unwrap();
        if !entries.iter().any(|e| e.path == path) {
            entries.push(Entry::file(path.clone(), data.len() as u64));
        }
        self.data
            .lock()
            .unwrap()
            .insert(path, Bytes::from_static(data));
    }

    /// Make the next call fail with `message`.
    pub(crate) fn fail_next(&self, message: &str) {
        *self.failure.lock().unwrap() = Some((None, message.to_string()));
    }

    /// Make the next `operation` call fail with `message`; other calls pass.
    pub(crate) fn fail_next_on(&self, operation: &str, message: &str) {
        *self.failure.lock().unwrap() = Some((Some(operation.to_string()), message.to_string()));
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(' ').next() == Some(operation))
            .count()
    }

    pub(crate) fn paths(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.path.clone())
            .collect()
    }

    fn record(&self, call: String) -> Result<()> {
        let operation = call.split(' ').next().unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(call);

        let mut failure = self.failure.lock().unwrap();
        let armed = match failure.as_ref() {
            Some((Some(target), _)) => *target == operation,
            Some((None, _)) => true,
            None => false,
        };
        match failure.take_if(|_| armed) {
            Some((_, message)) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StorageClient for RecordingClient {
    fn bucket_id(&self) -> &str {
        "test-bucket"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<Entry>> {
        self.record(format!("list {}", prefix))?;
        let prefix = clean_path(prefix);
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| prefix.is_empty() || e.path.starts_with(&format!("{}/", prefix)))
            .cloned()
            .collect())
    }

    async fn upload(&self, path: &str, data: Bytes, _content_type: Option<&str>) -> Result<()> {
        self.record(format!("upload {}", path))?;
        let path = clean_path(path);
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| e.path != path);
        entries.push(Entry::file(path.clone(), data.len() as u64));
        self.data.lock().unwrap().insert(path, data);
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Bytes> {
        self.record(format!("download {}", path))?;
        self.data
            .lock()
            .unwrap()
            .get(&clean_path(path))
            .cloned()
            .ok_or_else(|| anyhow!("object not found: {}", path))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.record(format!("delete {}", path))?;
        let path = clean_path(path);
        self.entries.lock().unwrap().retain(|e| e.path != path);
        self.data.lock().unwrap().remove(&path);
        Ok(())
    }

    async fn create_folder(&self, path: &str) -> Result<()> {
        self.record(format!("create_folder {}", path))?;
        self.entries.lock().unwrap().push(Entry::folder(path));
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.record(format!("rename {} -> {}", from, to))?;
        let from = clean_path(from);
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.path == from)
            .ok_or_else(|| anyhow!("object not found: {}", from))?;
        let renamed = if entry.is_folder {
            Entry::folder(to)
        } else {
            Entry::file(to, entry.size.unwrap_or_default())
        };
        *entry = renamed;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.record(format!("exists {}", path))?;
        let path = clean_path(path);
        Ok(self.entries.lock().unwrap().iter().any(|e| e.path == path))
    }

    fn public_url(&self, path: &str) -> Option<String> {
        Some(format!("https://cdn.test/{}", clean_path(path)))
    }
}
