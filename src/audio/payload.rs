//! The binary audio payload handed to the generation pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;

use super::mime::resolve_mime_type;

/// Local size ceiling: 15 MiB.
pub const MAX_PAYLOAD_BYTES: u64 = 15 * 1024 * 1024;

/// Display name used when the caller supplies none.
pub const DEFAULT_DISPLAY_NAME: &str = "Audio Institucional";

/// Display name for audio captured directly from a microphone.
pub const DIRECT_CAPTURE_NAME: &str = "Grabación Directa";

// ---------------------------------------------------------------------------
// PayloadError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload exceeds the local size ceiling.
    #[error("file too large ({size} bytes, limit is {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    /// The audio file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// AudioPayload
// ---------------------------------------------------------------------------

/// Audio bytes plus the metadata the pipeline needs.
///
/// Cloning is cheap: the bytes are reference-counted, so parking a payload
/// and dispatching it share one buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioPayload {
    data: Bytes,
    declared_type: Option<String>,
    display_name: String,
}

impl AudioPayload {
    /// Wrap in-memory audio.  An empty `display_name` becomes
    /// [`DEFAULT_DISPLAY_NAME`].
    pub fn new(
        data: impl Into<Bytes>,
        declared_type: Option<String>,
        display_name: impl Into<String>,
    ) -> Self {
        let display_name = display_name.into();
        let display_name = if display_name.trim().is_empty() {
            DEFAULT_DISPLAY_NAME.to_string()
        } else {
            display_name
        };

        Self {
            data: data.into(),
            declared_type,
            display_name,
        }
    }

    /// Read an audio file into memory.
    ///
    /// The size is checked from file metadata first, so oversized files are
    /// rejected without being read.  The display name defaults to the file
    /// name.
    pub async fn from_file(path: &Path, max_bytes: u64) -> Result<Self, PayloadError> {
        let io_err = |source| PayloadError::Io {
            path: path.to_path_buf(),
            source,
        };

        let size = tokio::fs::metadata(path).await.map_err(io_err)?.len();
        if size > max_bytes {
            return Err(PayloadError::TooLarge {
                size,
                max: max_bytes,
            });
        }

        let data = tokio::fs::read(path).await.map_err(io_err)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        log::debug!("audio: read {} bytes from {}", data.len(), path.display());
        Ok(Self::new(data, None, name))
    }

    /// Fail with [`PayloadError::TooLarge`] when the payload exceeds `max_bytes`.
    pub fn check_size(&self, max_bytes: u64) -> Result<(), PayloadError> {
        let size = self.len() as u64;
        if size > max_bytes {
            Err(PayloadError::TooLarge {
                size,
                max: max_bytes,
            })
        } else {
            Ok(())
        }
    }

    /// Content type to send with the bytes; see [`resolve_mime_type`].
    pub fn mime_type(&self) -> String {
        resolve_mime_type(self.declared_type.as_deref(), &self.display_name)
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for AudioPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioPayload")
            .field("len", &self.data.len())
            .field("declared_type", &self.declared_type)
            .field("display_name", &self.display_name)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
