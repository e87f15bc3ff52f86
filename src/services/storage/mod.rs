//! Object storage access for the browser.
//!
//! This module provides the storage client seam and the listing pipeline
//! that feeds the browser's tree.
//!
//! Supported storage backends (through Apache OpenDAL):
//!
//! - **Supabase Storage** via its S3-compatible endpoint
//! - **Amazon S3** and S3-compatible services (MinIO, Cloudflare R2)
//! - **Local Filesystem** for development (needs a Tokio runtime)
//! - **Memory** for tests and demos
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StorageFactory                           │
//! │  - Validates config, injects secrets, connects              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │           StorageClient (trait) ◄── OpendalStorage          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────┐ ┌──────────────┐ ┌──────────────────┐
//! │  list_entries    │→│ EntryFilter  │→│  (tree builder)  │
//! └──────────────────┘ └──────────────┘ └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use storage_browser::services::storage::{list_entries, EntryFilter};
//!
//! let entries = list_entries(client.as_ref(), "photos", None).await?;
//! let visible = EntryFilter::new(&["**/*"])?.with_extensions(&["png"]).apply(entries);
//! ```

mod factory;
mod filter;
mod glob;
mod listing;
mod operator;
mod traits;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use factory::StorageFactory;
pub use filter::{EntryFilter, normalize_extension};
pub use glob::GlobList;
pub use listing::{SortKey, SortOrder, list_entries};
pub use operator::OpendalStorage;
pub use traits::{SharedStorageClient, StorageClient};
pub use types::{
    Entry, StorageConfig, StorageParams, StorageType, clean_path, extension_of, join_path,
    size_display,
};
