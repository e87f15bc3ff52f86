//! Storage client factory.
//!
//! Validates a storage configuration and hands back a client for it, either
//! unconnected or connected and ready to share with a browser session.

use anyhow::{Result, anyhow};
use std::sync::Arc;

use super::operator::OpendalStorage;
use super::traits::SharedStorageClient;
use super::types::StorageConfig;

/// Factory for creating storage clients based on configuration.
///
/// # Example
///
/// ```ignore
/// use storage_browser::services::storage::{StorageConfig, StorageFactory, StorageParams, StorageType};
///
/// let config = StorageConfig::new(
///     "avatars".to_string(),
///     StorageType::Supabase,
///     StorageParams::supabase(
///         "https://abcd.supabase.co".to_string(),
///         "us-east-1".to_string(),
///         "avatars".to_string(),
///         Some("key-id".to_string()),
///     ),
/// );
///
/// let client = StorageFactory::connect(config, Some("secret".to_string())).await?;
/// ```
pub struct StorageFactory;

impl StorageFactory {
    /// Create an unconnected storage client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid for its storage type.
    pub fn create(config: StorageConfig) -> Result<OpendalStorage> {
        config.validate().map_err(|e| anyhow!(e))?;
        Ok(OpendalStorage::new(config))
    }

    /// Create a client, inject its secret and connect it.
    pub async fn connect(
        config: StorageConfig,
        secret: Option<String>,
    ) -> Result<SharedStorageClient> {
        let storage = Self::create(config)?;
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            storage.set_secret_key(secret).await;
        }
        storage.connect().await?;
        Ok(Arc::new(storage))
    }
}
