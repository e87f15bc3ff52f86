//! Backend configuration and listing entries.
//!
//! A [`StorageConfig`] says which bucket to open and how; an [`Entry`] is one
//! line of a listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// Supabase Storage, spoken to through its S3-compatible endpoint
    Supabase,
    /// S3 or anything speaking the S3 protocol
    S3,
    LocalFs,
    /// In-process store, mostly for tests and demos
    Memory,
}

impl StorageType {
    pub fn label(&self) -> &'static str {
        match self {
            StorageType::Supabase => "Supabase Storage",
            StorageType::S3 => "S3",
            StorageType::LocalFs => "Local directory",
            StorageType::Memory => "Memory",
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which bucket a browser opens, and through which backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub id: Uuid,
    /// Name shown in logs.
    pub name: String,
    pub storage_type: StorageType,
    pub params: StorageParams,
}

impl StorageConfig {
    pub fn new(name: String, storage_type: StorageType, params: StorageParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            storage_type,
            params,
        }
    }

    /// Check that the params fit the storage type and carry what the backend
    /// needs to open the bucket.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.storage_type, &self.params) {
            (
                StorageType::Supabase,
                StorageParams::Supabase {
                    project_url,
                    bucket,
                    ..
                },
            ) => {
                require("project_url", project_url)?;
                url::Url::parse(project_url)
                    .map_err(|e| format!("project_url {:?} is not a URL: {}", project_url, e))?;
                require("bucket", bucket)
            }
            (StorageType::S3, StorageParams::S3 { bucket, .. }) => require("bucket", bucket),
            (StorageType::LocalFs, StorageParams::LocalFs { root_path }) => {
                require("root_path", &root_path.to_string_lossy())
            }
            (StorageType::Memory, StorageParams::Memory { .. }) => Ok(()),
            (expected, params) => Err(format!(
                "{} storage cannot use {} params (type mismatch)",
                expected,
                params.kind_name()
            )),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} must not be empty", field))
    } else {
        Ok(())
    }
}

/// Backend-specific parameters.
///
/// Secrets are never part of the parameters; they are handed to the
/// connection separately with `OpendalStorage::set_secret_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageParams {
    Supabase {
        /// Project URL, e.g. `https://abcd.supabase.co`
        project_url: String,
        /// Project region (e.g. "us-east-1")
        region: String,
        /// Bucket id
        bucket: String,
        /// S3 access key id issued by the project
        access_key_id: Option<String>,
    },
    S3 {
        /// Custom endpoint; `None` means AWS
        endpoint: Option<String>,
        region: String,
        bucket: String,
        access_key_id: Option<String>,
        /// `bucket` goes in the path rather than the host name
        path_style: bool,
        /// Send unsigned requests (public buckets)
        allow_anonymous: bool,
        /// Base URL objects are publicly served from, if any
        #[serde(default)]
        public_base_url: Option<String>,
    },
    /// A directory standing in for a bucket. Only usable from inside a
    /// Tokio runtime.
    LocalFs {
        root_path: PathBuf,
    },
    Memory {
        /// Name reported as the bucket id
        #[serde(default)]
        bucket: String,
    },
}

impl StorageParams {
    /// Create Supabase parameters.
    pub fn supabase(
        project_url: String,
        region: String,
        bucket: String,
        access_key_id: Option<String>,
    ) -> Self {
        StorageParams::Supabase {
            project_url,
            region,
            bucket,
            access_key_id,
        }
    }

    /// Create S3 parameters.
    pub fn s3(
        endpoint: Option<String>,
        region: String,
        bucket: String,
        access_key_id: Option<String>,
        path_style: bool,
    ) -> Self {
        StorageParams::S3 {
            endpoint,
            region,
            bucket,
            access_key_id,
            path_style,
            allow_anonymous: false,
            public_base_url: None,
        }
    }

    pub fn local_fs(root_path: PathBuf) -> Self {
        StorageParams::LocalFs { root_path }
    }

    pub fn memory(bucket: impl Into<String>) -> Self {
        StorageParams::Memory {
            bucket: bucket.into(),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            StorageParams::Supabase { .. } => "supabase",
            StorageParams::S3 { .. } => "s3",
            StorageParams::LocalFs { .. } => "local_fs",
            StorageParams::Memory { .. } => "memory",
        }
    }

    /// Bucket the params point at. Local directories have none.
    pub fn bucket_name(&self) -> Option<&str> {
        match self {
            StorageParams::Supabase { bucket, .. }
            | StorageParams::S3 { bucket, .. }
            | StorageParams::Memory { bucket } => Some(bucket),
            StorageParams::LocalFs { .. } => None,
        }
    }
}

/// One listed object or folder.
///
/// `path` uses `/` separators, never ends with `/`, and is relative to
/// whatever the producer lists from (the bucket for a client, the browse
/// root after the listing adapter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Last path segment.
    pub name: String,
    pub path: String,
    pub is_folder: bool,
    /// Bytes; `None` for folders and for objects the backend did not size.
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
}

impl Entry {
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        let path = clean_path(&path.into());
        Self {
            name: last_segment(&path),
            path,
            is_folder: false,
            size: Some(size),
            last_modified: None,
            content_type: None,
        }
    }

    pub fn folder(path: impl Into<String>) -> Self {
        let path = clean_path(&path.into());
        Self {
            name: last_segment(&path),
            path,
            is_folder: true,
            size: None,
            last_modified: None,
            content_type: None,
        }
    }

    /// Set the last modified timestamp.
    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size_display(&self) -> String {
        size_display(self.size)
    }

    /// Extension without the dot; folders have none.
    pub fn extension(&self) -> Option<&str> {
        if self.is_folder {
            return None;
        }
        extension_of(&self.name)
    }
}

/// Format an optional byte count the way listings show it.
pub fn size_display(size: Option<u64>) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    let Some(bytes) = size else {
        return "-".to_string();
    };
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Extension of a file name, without the dot. Dotfiles have none.
pub fn extension_of(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Strip leading/trailing separators and collapse empty segments.
pub fn clean_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join two storage paths with a single separator.
pub fn join_path(base: &str, name: &str) -> String {
    let base = clean_path(base);
    let name = clean_path(name);
    match (base.is_empty(), name.is_empty()) {
        (true, _) => name,
        (_, true) => base,
        _ => format!("{}/{}", base, name),
    }
}

fn last_segment(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}
