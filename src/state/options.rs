//! Browser options and their resolution.
//!
//! Hosts hand the browser a loose JSON bag. The resolver layers it over the
//! process-wide defaults and the built-in defaults, coerces loosely typed
//! values, and produces a fully populated [`BrowserOptions`].

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::services::storage::{EntryFilter, GlobList, SortOrder, clean_path};
use crate::workspace::preview::PreviewKind;

const BOOL_KEYS: &[&str] = &[
    "show_preview",
    "show_preview_top",
    "ignore_file_select_event",
    "show_delete_file",
    "show_choose_file",
    "show_choose_folder",
    "show_download_file",
    "show_new_folder",
    "show_upload_file",
    "show_rename_file",
    "show_rename_folder",
    "use_cache",
];

const COUNT_KEYS: &[&str] = &["limit", "offset"];

const LIST_KEYS: &[&str] = &[
    "glob_patterns",
    "extentions",
    "file_ignores",
    "select_filetype_ignores",
];

/// Fully resolved browser configuration.
///
/// Keys the browser does not know about are kept in `extra` and handed to
/// the presentation layer unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Host widget key
    pub key: Option<String>,
    /// Bucket id the host expects to browse (informational)
    pub bucket_id: String,
    /// Browse root inside the bucket
    pub path: Option<String>,
    pub show_preview: bool,
    /// Place the preview above the tree instead of below
    pub show_preview_top: bool,
    pub glob_patterns: Vec<String>,
    /// Select files without reporting `file_selected`
    pub ignore_file_select_event: bool,
    /// Extension allow-list (spelling kept from the public option name)
    pub extentions: Vec<String>,
    pub show_delete_file: bool,
    pub show_choose_file: bool,
    pub show_choose_folder: bool,
    pub show_download_file: bool,
    pub show_new_folder: bool,
    pub show_upload_file: bool,
    pub show_rename_file: bool,
    pub show_rename_folder: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Option<SortOrder>,
    pub use_cache: bool,
    /// Glob patterns removed from the listing
    pub file_ignores: Vec<String>,
    /// Suffixes that never get a preview
    pub select_filetype_ignores: Vec<String>,
    /// Extension to preview kind, overriding the built-in table
    pub preview_overrides: BTreeMap<String, PreviewKind>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            key: None,
            bucket_id: String::new(),
            path: None,
            show_preview: true,
            show_preview_top: false,
            glob_patterns: vec!["**/*".to_string()],
            ignore_file_select_event: false,
            extentions: Vec::new(),
            show_delete_file: false,
            show_choose_file: false,
            show_choose_folder: false,
            show_download_file: true,
            show_new_folder: false,
            show_upload_file: false,
            show_rename_file: false,
            show_rename_folder: false,
            limit: None,
            offset: None,
            sort: None,
            use_cache: false,
            file_ignores: Vec::new(),
            select_filetype_ignores: Vec::new(),
            preview_overrides: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

impl BrowserOptions {
    /// Browse root, cleaned.
    pub fn root(&self) -> String {
        clean_path(self.path.as_deref().unwrap_or_default())
    }

    /// Build the filter stage for these options.
    ///
    /// Fails if a glob pattern or ignore pattern does not compile.
    pub fn entry_filter(&self) -> Result<EntryFilter> {
        Ok(EntryFilter::new(&self.glob_patterns)?
            .with_ignores(&self.file_ignores)?
            .with_extensions(&self.extentions)
            .with_offset(self.offset)
            .with_limit(self.limit))
    }

    /// Hash of every option that changes what the listing produces.
    ///
    /// Visibility flags are left out: toggling a button does not need a
    /// new tree.
    pub fn listing_fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.root().hash(&mut hasher);
        self.glob_patterns.hash(&mut hasher);
        self.extentions.hash(&mut hasher);
        self.file_ignores.hash(&mut hasher);
        self.limit.hash(&mut hasher);
        self.offset.hash(&mut hasher);
        self.sort.hash(&mut hasher);
        hasher.finish()
    }

    /// Whether `path` ends with one of the `select_filetype_ignores` suffixes.
    pub fn is_preview_ignored(&self, path: &str) -> bool {
        self.select_filetype_ignores
            .iter()
            .any(|suffix| !suffix.is_empty() && path.ends_with(suffix.as_str()))
    }

    /// Validate values serde cannot check.
    pub fn validate(&self) -> Result<(), String> {
        if self.glob_patterns.iter().any(|p| p.is_empty()) {
            return Err("glob_patterns must not contain empty patterns".to_string());
        }
        GlobList::new(&self.glob_patterns).map_err(|e| format!("glob_patterns: {:#}", e))?;
        GlobList::new(&self.file_ignores).map_err(|e| format!("file_ignores: {:#}", e))?;
        if let Some(ext) = self.extentions.iter().find(|e| e.contains('/')) {
            return Err(format!("extentions entry {:?} is not a file extension", ext));
        }
        if self.preview_overrides.keys().any(|k| k.trim_start_matches('.').is_empty()) {
            return Err("preview_overrides keys must be file extensions".to_string());
        }
        Ok(())
    }
}

/// Resolves option bags against layered defaults.
#[derive(Debug, Clone, Default)]
pub struct OptionsResolver {
    defaults: Map<String, Value>,
}

impl OptionsResolver {
    /// A resolver with only the built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver with process-wide defaults layered over the built-ins.
    pub fn with_defaults(defaults: Value) -> Result<Self> {
        match defaults {
            Value::Object(defaults) => Ok(Self { defaults }),
            Value::Null => Ok(Self::default()),
            other => bail!("option defaults must be a JSON object, got {}", other),
        }
    }

    /// Default location of the process-wide defaults file.
    pub fn defaults_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("storage-browser").join("defaults.json"))
    }

    /// Load process-wide defaults from the user's config directory.
    pub async fn load_process_defaults() -> Result<Self> {
        match Self::defaults_path() {
            Some(path) => Self::load_defaults_from(&path).await,
            None => Ok(Self::default()),
        }
    }

    /// Load process-wide defaults from a JSON file. A missing file yields
    /// the built-in defaults only.
    pub async fn load_defaults_from(path: &Path) -> Result<Self> {
        let contents = match async_fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No option defaults at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read option defaults {}", path.display()));
            }
        };

        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid option defaults in {}", path.display()))?;
        tracing::debug!("Loaded option defaults from {}", path.display());
        Self::with_defaults(value)
    }

    /// Resolve a caller's option bag.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be coerced to its option's type.
    pub fn resolve(&self, overrides: Value) -> Result<BrowserOptions> {
        let overrides = match overrides {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => bail!("options must be a JSON object, got {}", other),
        };

        let mut merged = self.defaults.clone();
        merged.extend(overrides);
        let merged = coerce(merged)?;

        let options: BrowserOptions = serde_json::from_value(Value::Object(merged))
            .context("invalid configuration value")?;
        options.validate().map_err(|e| anyhow!(e))?;

        Ok(options)
    }
}

/// Coerce loosely typed values to the types the options expect. `null`
/// means "use the default".
fn coerce(map: Map<String, Value>) -> Result<Map<String, Value>> {
    let mut coerced = Map::new();

    for (key, value) in map {
        if value.is_null() {
            continue;
        }

        let value = if BOOL_KEYS.contains(&key.as_str()) {
            coerce_bool(&key, value)?
        } else if COUNT_KEYS.contains(&key.as_str()) {
            coerce_count(&key, value)?
        } else if LIST_KEYS.contains(&key.as_str()) {
            coerce_list(&key, value)?
        } else {
            value
        };

        coerced.insert(key, value);
    }

    Ok(coerced)
}

fn coerce_bool(key: &str, value: Value) -> Result<Value> {
    let flag = match &value {
        Value::Bool(b) => *b,
        Value::Number(n) if n.as_u64() == Some(0) => false,
        Value::Number(n) if n.as_u64() == Some(1) => true,
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => bail!("invalid configuration value for `{}`: {}", key, value),
        },
        _ => bail!("invalid configuration value for `{}`: {}", key, value),
    };
    Ok(Value::Bool(flag))
}

fn coerce_count(key: &str, value: Value) -> Result<Value> {
    let count = match &value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match count {
        Some(count) => Ok(Value::from(count)),
        None => bail!("invalid configuration value for `{}`: {}", key, value),
    }
}

fn coerce_list(key: &str, value: Value) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::Array(vec![Value::String(s)])),
        Value::Array(items) if items.iter().all(Value::is_string) => Ok(Value::Array(items)),
        other => bail!("invalid configuration value for `{}`: {}", key, other),
    }
}
