//! Core `GenerationService` trait — the streaming boundary to the external
//! model.
//!
//! A successful [`open_stream`](GenerationService::open_stream) hands back the
//! receiving half of a bounded channel.  Each message is one text chunk (or
//! a terminal error); the channel closing is the end of the stream.  The
//! channel gives the ordering and single-delivery guarantees: chunks arrive
//! exactly once, in the order the service produced them.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::store::Credential;

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// Raw failures from the generation service, before classification.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Non-success HTTP status; `body` is the raw response text, which
    /// usually embeds a structured JSON error.
    #[error("[{status}] {body}")]
    Api { status: u16, body: String },

    /// The stream broke or carried an error event after it was opened.
    #[error("stream error: {0}")]
    Stream(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ServiceError::Timeout
        } else {
            ServiceError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationRequest
// ---------------------------------------------------------------------------

/// Everything sent in one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Audio bytes, sent inline.
    pub audio: Bytes,
    /// Resolved transport content type of `audio`.
    pub mime_type: String,
    /// Prompt text from [`PromptBuilder`](crate::generation::PromptBuilder).
    pub prompt: String,
}

/// Receiving end of a chunk stream.
pub type ChunkReceiver = mpsc::Receiver<Result<String, ServiceError>>;

/// Channel depth between the network task and the pipeline.
pub const CHUNK_CHANNEL_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// GenerationService trait
// ---------------------------------------------------------------------------

/// Async trait for streaming generation backends.
///
/// Implementors must be `Send + Sync` so they can be held as
/// `Arc<dyn GenerationService>`.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Dispatch `request` and return the chunk stream.
    ///
    /// Errors returned here happen before any chunk; errors inside the
    /// stream arrive as an `Err` message, after which the channel closes.
    async fn open_stream(
        &self,
        credential: &Credential,
        request: GenerationRequest,
    ) -> Result<ChunkReceiver, ServiceError>;
}
