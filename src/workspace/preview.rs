//! File preview pane.
//!
//! Picks a preview kind from the file extension (or from the content's
//! magic bytes when the extension is unknown) and turns the object into a
//! body the host can display.

use anyhow::{Context, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::services::storage::{StorageClient, extension_of, normalize_extension};

/// Rows kept in a tabular preview.
const MAX_TABLE_ROWS: usize = 1000;

/// How a file is previewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewKind {
    Json,
    Pdf,
    Csv,
    Tsv,
    PlainText,
    Markdown,
    Code,
    Html,
    Image,
    Video,
    Audio,
}

impl PreviewKind {
    /// Kinds the host displays straight from the object's URL.
    pub fn is_linked(&self) -> bool {
        matches!(
            self,
            PreviewKind::Pdf | PreviewKind::Image | PreviewKind::Video | PreviewKind::Audio
        )
    }
}

/// Rendered preview content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreviewBody {
    /// Plain text, Markdown or HTML source
    Text { text: String },
    Code { language: String, source: String },
    Json { value: Value },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        truncated: bool,
    },
    /// Displayed from `Preview::url`
    Link,
    /// The object disappeared between listing and selection
    NotFound,
    /// No previewer for this file
    Unavailable { extension: Option<String> },
    /// The previewer failed
    Failed { message: String },
}

/// Preview of one selected file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub path: String,
    pub url: Option<String>,
    pub kind: Option<PreviewKind>,
    pub body: PreviewBody,
}

impl Preview {
    /// Preview for a file that no longer exists.
    pub fn not_found(path: &str) -> Self {
        Self {
            path: path.to_string(),
            url: None,
            kind: None,
            body: PreviewBody::NotFound,
        }
    }
}

/// Preview kind for a path, from its extension.
pub fn classify(path: &str, overrides: &BTreeMap<String, PreviewKind>) -> Option<PreviewKind> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = extension_of(name)?.to_lowercase();

    let overridden = overrides
        .iter()
        .find(|(key, _)| normalize_extension(key) == ext)
        .map(|(_, kind)| *kind);
    if overridden.is_some() {
        return overridden;
    }

    let kind = match ext.as_str() {
        "json" => PreviewKind::Json,
        "pdf" => PreviewKind::Pdf,
        "csv" => PreviewKind::Csv,
        "tsv" => PreviewKind::Tsv,
        "log" | "txt" | "upf" | "orb" => PreviewKind::PlainText,
        "md" => PreviewKind::Markdown,
        "py" | "sh" => PreviewKind::Code,
        "html" | "htm" => PreviewKind::Html,
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "bmp" | "ico" => PreviewKind::Image,
        "mp4" | "webm" | "mov" | "mkv" => PreviewKind::Video,
        "mp3" | "wav" | "ogg" | "flac" | "m4a" => PreviewKind::Audio,
        _ => return None,
    };
    Some(kind)
}

/// Detect image, video and audio content from magic bytes.
pub fn sniff(data: &[u8]) -> Option<PreviewKind> {
    if starts_at(data, 0, b"\x89PNG\r\n\x1a\n")
        || starts_at(data, 0, &[0xFF, 0xD8, 0xFF])
        || starts_at(data, 0, b"GIF87a")
        || starts_at(data, 0, b"GIF89a")
        || (starts_at(data, 0, b"RIFF") && starts_at(data, 8, b"WEBP"))
    {
        return Some(PreviewKind::Image);
    }
    if starts_at(data, 4, b"ftyp") || starts_at(data, 0, &[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some(PreviewKind::Video);
    }
    if starts_at(data, 0, b"ID3")
        || starts_at(data, 0, &[0xFF, 0xFB])
        || starts_at(data, 0, &[0xFF, 0xF3])
        || starts_at(data, 0, &[0xFF, 0xF2])
        || (starts_at(data, 0, b"RIFF") && starts_at(data, 8, b"WAVE"))
        || starts_at(data, 0, b"OggS")
        || starts_at(data, 0, b"fLaC")
    {
        return Some(PreviewKind::Audio);
    }
    None
}

/// Render downloaded content for a text-like preview kind.
pub fn render_body(kind: PreviewKind, path: &str, data: &Bytes) -> Result<PreviewBody> {
    let body = match kind {
        PreviewKind::Json => PreviewBody::Json {
            value: serde_json::from_slice(data).context("Preview is not valid JSON")?,
        },
        PreviewKind::Csv => render_table(data, b',')?,
        PreviewKind::Tsv => render_table(data, b'\t')?,
        PreviewKind::Code => PreviewBody::Code {
            language: code_language(path).to_string(),
            source: decode_text(data)?,
        },
        PreviewKind::PlainText | PreviewKind::Markdown | PreviewKind::Html => PreviewBody::Text {
            text: decode_text(data)?,
        },
        PreviewKind::Pdf | PreviewKind::Image | PreviewKind::Video | PreviewKind::Audio => {
            PreviewBody::Link
        }
    };
    Ok(body)
}

/// Build the preview of `key` (bucket path), labelled with `path`.
///
/// Previewer failures end up in the body rather than in an error, so a bad
/// file never breaks the render.
pub async fn load_preview(
    client: &dyn StorageClient,
    key: &str,
    path: &str,
    overrides: &BTreeMap<String, PreviewKind>,
) -> Preview {
    let url = client.public_url(key);
    let mut kind = classify(path, overrides);

    let body = match kind {
        Some(k) if k.is_linked() => PreviewBody::Link,
        Some(k) => match client.download(key).await {
            Ok(data) => render_body(k, path, &data).unwrap_or_else(|e| failed(path, e)),
            Err(e) => failed(path, e),
        },
        None => match client.download(key).await {
            Ok(data) => match sniff(&data) {
                Some(sniffed) => {
                    kind = Some(sniffed);
                    PreviewBody::Link
                }
                None => PreviewBody::Unavailable {
                    extension: extension_of(path).map(|e| e.to_string()),
                },
            },
            Err(e) => failed(path, e),
        },
    };

    Preview {
        path: path.to_string(),
        url,
        kind,
        body,
    }
}

fn starts_at(data: &[u8], offset: usize, magic: &[u8]) -> bool {
    data.get(offset..offset + magic.len()) == Some(magic)
}

fn failed(path: &str, error: anyhow::Error) -> PreviewBody {
    tracing::warn!("Failed preview {}: {:#}", path, error);
    PreviewBody::Failed {
        message: format!("{:#}", error),
    }
}

fn decode_text(data: &Bytes) -> Result<String> {
    String::from_utf8(data.to_vec()).context("Preview is not valid UTF-8 text")
}

fn code_language(path: &str) -> &'static str {
    match extension_of(path).map(|ext| ext.to_lowercase()).as_deref() {
        Some("py") => "python",
        Some("sh") => "bash",
        _ => "text",
    }
}

fn render_table(data: &Bytes, delimiter: u8) -> Result<PreviewBody> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(data.as_ref());

    let headers = reader
        .headers()
        .context("Failed to read table header")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    let mut truncated = false;
    for record in reader.records() {
        if rows.len() == MAX_TABLE_ROWS {
            truncated = true;
            break;
        }
        let record = record.context("Failed to read table row")?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }

    Ok(PreviewBody::Table {
        headers,
        rows,
        truncated,
    })
}
