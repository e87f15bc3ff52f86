//! OpenDAL-backed storage client.
//!
//! One implementation covers every supported backend: the operator is built
//! from the [`StorageConfig`] on connect and every call goes through it.
//!
//! - **Supabase Storage** through its S3-compatible endpoint
//! - **Amazon S3** and S3-compatible services (MinIO, Cloudflare R2)
//! - **Local filesystem** for development
//! - **Memory** for tests and demos
//!
//! The local filesystem backend does its I/O through Tokio, so it has to be
//! driven from inside a Tokio runtime. The other backends run on any
//! executor.

use anyhow::{Context, Result, anyhow};
use async_lock::RwLock;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use opendal::layers::LoggingLayer;
use opendal::services::{Fs, Memory, S3};
use opendal::{EntryMode, ErrorKind, Operator};
use url::Url;

use super::traits::StorageClient;
use super::types::{Entry, StorageConfig, StorageParams, StorageType};

/// Storage client implementation over an OpenDAL [`Operator`].
pub struct OpendalStorage {
    config: StorageConfig,
    operator: RwLock<Option<Operator>>,
    /// Secret access key, injected separately from the config
    secret_key: RwLock<Option<String>>,
}

impl OpendalStorage {
    /// Create a new, unconnected storage client.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            operator: RwLock::new(None),
            secret_key: RwLock::new(None),
        }
    }

    /// Get the storage type for this connection.
    pub fn storage_type(&self) -> StorageType {
        self.config.storage_type
    }

    /// Get the connection configuration.
    pub fn storage_config(&self) -> &StorageConfig {
        &self.config
    }

    /// Set the secret access key.
    pub async fn set_secret_key(&self, secret_key: String) {
        let mut guard = self.secret_key.write().await;
        *guard = Some(secret_key);
    }

    /// Build the operator and verify the backend is reachable.
    pub async fn connect(&self) -> Result<()> {
        let op = self.build_operator().await?;

        op.check().await.map_err(|e| {
            anyhow!(
                "Failed to connect to {}: {}. Check your credentials and bucket name.",
                self.config.storage_type,
                e
            )
        })?;

        let mut guard = self.operator.write().await;
        *guard = Some(op);
        tracing::info!("Connected to storage: {}", self.config.name);

        Ok(())
    }

    /// Drop the operator.
    pub async fn disconnect(&self) -> Result<()> {
        let mut guard = self.operator.write().await;
        *guard = None;
        Ok(())
    }

    /// Check if currently connected.
    pub async fn is_connected(&self) -> bool {
        self.operator.read().await.is_some()
    }

    /// Test the connection without keeping it.
    pub async fn test_connection(&self) -> Result<()> {
        let op = self.build_operator().await?;
        op.check().await.map_err(|e| {
            anyhow!(
                "Connection test failed: {}. Check your credentials and bucket access.",
                e
            )
        })?;
        Ok(())
    }

    /// Fail instead of panicking when a Tokio-bound backend is used without
    /// a runtime.
    fn ensure_runtime(&self) -> Result<()> {
        if matches!(self.config.params, StorageParams::LocalFs { .. })
            && tokio::runtime::Handle::try_current().is_err()
        {
            return Err(anyhow!(
                "Local directory storage needs a Tokio runtime; call it from within one"
            ));
        }
        Ok(())
    }

    /// Build the OpenDAL operator for the configured backend.
    async fn build_operator(&self) -> Result<Operator> {
        self.ensure_runtime()?;
        let secret = self.secret_key.read().await.clone();

        let op = match &self.config.params {
            StorageParams::Supabase {
                project_url,
                region,
                bucket,
                access_key_id,
            } => {
                let endpoint = format!("{}/storage/v1/s3", project_url.trim_end_matches('/'));
                let mut builder = S3::default()
                    .endpoint(&endpoint)
                    .region(region)
                    .bucket(bucket);
                if let Some(key_id) = access_key_id {
                    builder = builder.access_key_id(key_id);
                    if let Some(secret) = secret.as_deref() {
                        builder = builder.secret_access_key(secret);
                    }
                }
                Operator::new(builder)?
                    .layer(LoggingLayer::default())
                    .finish()
            }
            StorageParams::S3 {
                endpoint,
                region,
                bucket,
                access_key_id,
                path_style,
                allow_anonymous,
                ..
            } => {
                let mut builder = S3::default().bucket(bucket).region(region);

                if let Some(ep) = endpoint.as_deref().filter(|ep| !ep.is_empty()) {
                    builder = builder.endpoint(ep);
                }

                if *allow_anonymous {
                    builder = builder.allow_anonymous();
                } else if let Some(key_id) = access_key_id {
                    builder = builder.access_key_id(key_id);
                    if let Some(secret) = secret.as_deref() {
                        builder = builder.secret_access_key(secret);
                    }
                }

                // OpenDAL defaults to path-style addressing
                if !path_style {
                    builder = builder.enable_virtual_host_style();
                }

                Operator::new(builder)?
                    .layer(LoggingLayer::default())
                    .finish()
            }
            StorageParams::LocalFs { root_path } => {
                let root = root_path
                    .to_str()
                    .ok_or_else(|| anyhow!("Invalid path encoding"))?;
                Operator::new(Fs::default().root(root))?
                    .layer(LoggingLayer::default())
                    .finish()
            }
            StorageParams::Memory { .. } => Operator::new(Memory::default())?
                .layer(LoggingLayer::default())
                .finish(),
        };

        Ok(op)
    }

    /// Get the operator, returning an error if not connected.
    async fn get_operator(&self) -> Result<Operator> {
        self.ensure_runtime()?;
        let guard = self.operator.read().await;
        guard
            .as_ref()
            .cloned()
            .ok_or_else(|| anyhow!("Storage not connected"))
    }

    /// Normalize a path for OpenDAL (no leading slash).
    fn normalize_path(path: &str) -> &str {
        path.trim_start_matches('/')
    }

    /// Directory form of a path, as the lister expects it.
    fn dir_path(path: &str) -> String {
        let path = Self::normalize_path(path).trim_end_matches('/');
        if path.is_empty() {
            "/".to_string()
        } else {
            format!("{}/", path)
        }
    }

    /// Base URL objects are publicly served from, ending with `/`.
    fn public_base(&self) -> Option<String> {
        match &self.config.params {
            StorageParams::Supabase {
                project_url,
                bucket,
                ..
            } => Some(format!(
                "{}/storage/v1/object/public/{}/",
                project_url.trim_end_matches('/'),
                bucket
            )),
            StorageParams::S3 {
                public_base_url, ..
            } => public_base_url
                .as_ref()
                .map(|base| format!("{}/", base.trim_end_matches('/'))),
            StorageParams::LocalFs { root_path } => Url::from_directory_path(root_path)
                .ok()
                .map(|url| url.to_string()),
            StorageParams::Memory { .. } => None,
        }
    }

    /// Move one object, by copy when the backend has it and by
    /// read-and-write otherwise.
    async fn move_object(op: &Operator, from: &str, to: &str) -> Result<()> {
        if op.info().full_capability().copy {
            op.copy(from, to)
                .await
                .with_context(|| format!("Failed to copy {} to {}", from, to))?;
        } else {
            let data = op
                .read(from)
                .await
                .with_context(|| format!("Failed to read {}", from))?;
            op.write(to, data)
                .await
                .with_context(|| format!("Failed to write {}", to))?;
        }
        op.delete(from)
            .await
            .with_context(|| format!("Failed to delete {}", from))?;
        Ok(())
    }

    /// Convert OpenDAL metadata to an [`Entry`].
    fn to_entry(path: &str, metadata: &opendal::Metadata) -> Entry {
        let entry = if metadata.mode() == EntryMode::DIR {
            Entry::folder(path)
        } else {
            Entry::file(path, metadata.content_length())
        };

        Entry {
            last_modified: metadata
                .last_modified()
                .and_then(|t| DateTime::<Utc>::from_timestamp(t.timestamp(), 0)),
            content_type: metadata.content_type().map(|s| s.to_string()),
            ..entry
        }
    }
}

#[async_trait]
impl StorageClient for OpendalStorage {
    fn bucket_id(&self) -> &str {
        self.config
            .params
            .bucket_name()
            .unwrap_or(self.config.name.as_str())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<Entry>> {
        let op = self.get_operator().await?;
        let dir = Self::dir_path(prefix);

        let mut lister = op.lister_with(&dir).recursive(true).await?;

        let mut entries = Vec::new();

        while let Some(entry) = lister.next().await {
            let entry = entry?;
            let entry_path = entry.path();

            // Skip the listed directory itself
            if entry_path == dir || entry_path.trim_matches('/').is_empty() {
                continue;
            }

            entries.push(Self::to_entry(entry_path, entry.metadata()));
        }

        tracing::debug!("Listed {} objects under {:?}", entries.len(), dir);
        Ok(entries)
    }

    async fn upload(&self, path: &str, data: Bytes, content_type: Option<&str>) -> Result<()> {
        let op = self.get_operator().await?;
        let path = Self::normalize_path(path);

        let supports_content_type = op.info().full_capability().write_with_content_type;
        match content_type {
            Some(content_type) if supports_content_type => {
                op.write_with(path, data).content_type(content_type).await?;
            }
            _ => {
                op.write(path, data).await?;
            }
        }
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Bytes> {
        let op = self.get_operator().await?;
        let path = Self::normalize_path(path);

        let data = op.read(path).await?.to_vec();
        Ok(Bytes::from(data))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let op = self.get_operator().await?;
        let path = Self::normalize_path(path);

        op.delete(path).await?;
        Ok(())
    }

    async fn create_folder(&self, path: &str) -> Result<()> {
        let op = self.get_operator().await?;
        let path = Self::dir_path(path);

        op.create_dir(&path).await?;
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let op = self.get_operator().await?;
        let from = Self::normalize_path(from);
        let to = Self::normalize_path(to);

        if op.info().full_capability().rename {
            op.rename(from, to)
                .await
                .with_context(|| format!("Failed to rename {} to {}", from, to))?;
            return Ok(());
        }

        // No native rename: move a folder object by object
        let dir = Self::dir_path(from);
        let listed = match op.list_with(&dir).recursive(true).await {
            Ok(listed) => listed,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e).with_context(|| format!("Failed to list {}", dir)),
        };

        if listed.is_empty() {
            return Self::move_object(&op, from, to).await;
        }

        let to_dir = Self::dir_path(to);
        let create_dirs = op.info().full_capability().create_dir;
        let mut folders = Vec::new();
        for entry in &listed {
            let child = entry.path();
            let target = format!("{}{}", to_dir, child.strip_prefix(&dir).unwrap_or(child));
            if entry.metadata().mode() == EntryMode::DIR {
                if create_dirs {
                    op.create_dir(&target)
                        .await
                        .with_context(|| format!("Failed to create {}", target))?;
                }
                folders.push(child.to_string());
            } else {
                Self::move_object(&op, child, &target).await?;
            }
        }

        // Deepest markers first
        folders.sort_by_key(|folder| std::cmp::Reverse(folder.len()));
        for folder in &folders {
            op.delete(folder)
                .await
                .with_context(|| format!("Failed to delete {}", folder))?;
        }
        tracing::debug!("Moved {} objects from {} to {}", listed.len(), dir, to_dir);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let op = self.get_operator().await?;
        let path = Self::normalize_path(path);

        Ok(op.exists(path).await?)
    }

    fn public_url(&self, path: &str) -> Option<String> {
        let base = Url::parse(&self.public_base()?).ok()?;
        base.join(Self::normalize_path(path))
            .ok()
            .map(|url| url.to_string())
    }
}
