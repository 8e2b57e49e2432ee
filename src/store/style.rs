//! Style configuration store — the free-text "style examples" used to bias
//! the tone of generated alerts.
//!
//! Source priority on [`StyleStore::load`]:
//!
//! 1. the shared document (URL or file) named in the config, when it can be
//!    fetched and carries a non-empty `style_examples` string;
//! 2. the locally cached value;
//! 3. empty text.
//!
//! Operator edits and imports are written to the local cache only.  The
//! snapshot file format, used by both export and import, is
//!
//! ```json
//! { "style_examples": "...", "timestamp": "2026-10-19T17:05:00.000Z" }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::kv::{SharedStore, StoreError};

/// Storage key of the cached style text.
pub const STYLE_KEY: &str = "style_examples";

/// Field that carries the text in both the shared document and snapshots.
pub const STYLE_FIELD: &str = "style_examples";

const SHARED_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// StyleError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StyleError {
    /// The snapshot is not JSON, or lacks a string `style_examples` field.
    #[error("the style file does not have the expected format: {0}")]
    Format(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// StyleSnapshot
// ---------------------------------------------------------------------------

/// Exported/imported style file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSnapshot {
    pub style_examples: String,
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// SharedSource
// ---------------------------------------------------------------------------

/// Location of the shared style document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedSource {
    Url(String),
    File(PathBuf),
}

impl SharedSource {
    /// `http://` and `https://` values are URLs, anything else is a path.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Url(value.to_string())
        } else {
            Self::File(PathBuf::from(value))
        }
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<String, String> {
        match self {
            Self::Url(url) => {
                let response = client
                    .get(url)
                    .timeout(SHARED_FETCH_TIMEOUT)
                    .send()
                    .await
                    .map_err(|e| e.to_string())?;
                if !response.status().is_success() {
                    return Err(format!("HTTP {}", response.status()));
                }
                response.text().await.map_err(|e| e.to_string())
            }
            Self::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("{}: {e}", path.display())),
        }
    }
}

// ---------------------------------------------------------------------------
// StyleStore
// ---------------------------------------------------------------------------

pub struct StyleStore {
    kv: SharedStore,
    shared: Option<SharedSource>,
    client: reqwest::Client,
}

impl StyleStore {
    /// Store without a shared document; [`load`](Self::load) returns the
    /// cached value.
    pub fn new(kv: SharedStore) -> Self {
        Self {
            kv,
            shared: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_shared_source(mut self, source: Option<SharedSource>) -> Self {
        self.shared = source;
        self
    }

    pub fn shared_source(&self) -> Option<&SharedSource> {
        self.shared.as_ref()
    }

    /// Resolve the current style text by source priority.
    ///
    /// Shared-document problems (unreachable, missing, malformed, empty
    /// field) are logged and never surfaced; the cache answers instead.  A
    /// successful shared fetch refreshes the cache.
    pub async fn load(&self) -> String {
        if let Some(source) = &self.shared {
            match source.fetch(&self.client).await {
                Ok(body) => match shared_style_text(&body) {
                    Some(text) => {
                        log::info!("style: loaded shared style examples ({} chars)", text.len());
                        if let Err(e) = self.kv.set(STYLE_KEY, &text) {
                            log::warn!("style: cannot cache shared style examples: {e}");
                        }
                        return text;
                    }
                    None => log::warn!(
                        "style: shared document has no usable `{STYLE_FIELD}`; using cache"
                    ),
                },
                Err(e) => log::warn!("style: shared document unavailable ({e}); using cache"),
            }
        }

        self.cached()
    }

    /// The locally cached text, or empty.
    pub fn cached(&self) -> String {
        match self.kv.get(STYLE_KEY) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                log::warn!("style: cannot read cached style examples: {e}");
                String::new()
            }
        }
    }

    /// Persist operator-edited text locally.
    pub fn save(&self, text: &str) -> Result<(), StoreError> {
        self.kv.set(STYLE_KEY, text)?;
        log::info!("style: saved ({} chars)", text.len());
        Ok(())
    }

    /// Parse a snapshot, persist its text and return it.
    ///
    /// Any JSON that is not an object with a string `style_examples` field is
    /// a [`StyleError::Format`]; nothing is written in that case.  Other
    /// fields (including `timestamp`) are ignored.
    pub fn import_snapshot(&self, json: &str) -> Result<String, StyleError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| StyleError::Format(format!("invalid JSON: {e}")))?;

        let text = match value.get(STYLE_FIELD) {
            Some(serde_json::Value::String(text)) => text.clone(),
            Some(_) => {
                return Err(StyleError::Format(format!("`{STYLE_FIELD}` must be a string")))
            }
            None => return Err(StyleError::Format(format!("missing `{STYLE_FIELD}` field"))),
        };

        self.kv.set(STYLE_KEY, &text)?;
        log::info!("style: imported snapshot ({} chars)", text.len());
        Ok(text)
    }

    /// Serialise `text` as a pretty-printed snapshot stamped `generated_at`.
    ///
    /// Output depends only on the two arguments.
    pub fn export_snapshot(text: &str, generated_at: DateTime<Utc>) -> Vec<u8> {
        let snapshot = StyleSnapshot {
            style_examples: text.to_string(),
            timestamp: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        // Serialising a struct of two strings cannot fail.
        serde_json::to_vec_pretty(&snapshot).unwrap_or_default()
    }

    /// Default download name for a snapshot exported on `date`.
    pub fn snapshot_file_name(date: NaiveDate) -> String {
        format!("alerta_estilo_{}.json", date.format("%Y-%m-%d"))
    }
}

/// Non-empty `style_examples` string of a shared document.
fn shared_style_text(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get(STYLE_FIELD)?
        .as_str()
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
