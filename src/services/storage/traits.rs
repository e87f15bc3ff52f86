//! Storage client trait.
//!
//! The browser never talks to a backend directly. Everything it needs from
//! the bucket goes through [`StorageClient`], so hosts can plug in the
//! bundled OpenDAL implementation or their own SDK wrapper.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use super::types::Entry;

/// Operations the browser needs from an object storage bucket.
///
/// Paths are bucket-relative, `/`-separated and carry no leading slash.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Identifier of the bucket this client is bound to.
    fn bucket_id(&self) -> &str;

    /// List every object under `prefix`, recursively.
    ///
    /// # Arguments
    ///
    /// * `prefix` - Folder to list (empty string for the bucket root)
    ///
    /// # Returns
    ///
    /// A flat list of files and folders with bucket-relative paths.
    async fn list(&self, prefix: &str) -> Result<Vec<Entry>>;

    /// Write `data` to `path`, replacing any existing object.
    async fn upload(&self, path: &str, data: Bytes, content_type: Option<&str>) -> Result<()>;

    /// Read the full contents of an object.
    async fn download(&self, path: &str) -> Result<Bytes>;

    /// Delete an object.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Create a folder.
    ///
    /// Object stores have no real directories; implementations write an
    /// empty marker object so the folder shows up in listings.
    async fn create_folder(&self, path: &str) -> Result<()>;

    /// Rename/move an object.
    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Check if an object exists.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Public URL of an object, if the backend serves one.
    fn public_url(&self, path: &str) -> Option<String>;
}

/// A shared storage client for dynamic dispatch.
pub type SharedStorageClient = Arc<dyn StorageClient>;
