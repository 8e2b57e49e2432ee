//! Generation module — turns audio plus a prompt into streamed alert text.
//!
//! This module provides:
//! * [`GenerationService`] — async trait for streaming model backends.
//! * [`GeminiClient`] — Generative Language API backend (SSE streaming).
//! * [`PromptBuilder`] — builds dated, style-biased press-alert prompts.
//! * [`GenerationError`] / [`classify`] — operator-facing error taxonomy.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use chrono::Local;
//! use press_alert::config::AppConfig;
//! use press_alert::generation::{GeminiClient, GenerationRequest, GenerationService, PromptBuilder};
//! use press_alert::store::Credential;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = GeminiClient::from_config(&config.generation);
//!     let prompt = PromptBuilder::new(&config.locale).build(Local::now().date_naive(), "");
//!
//!     let request = GenerationRequest {
//!         audio: Bytes::from(std::fs::read("clip1.mp3").unwrap()),
//!         mime_type: "audio/mpeg".into(),
//!         prompt,
//!     };
//!     let mut chunks = client
//!         .open_stream(&Credential::new("AIza-example"), request)
//!         .await
//!         .unwrap();
//!     while let Some(chunk) = chunks.recv().await {
//!         print!("{}", chunk.unwrap());
//!     }
//! }
//! ```

pub mod error;
pub mod gemini;
pub mod prompt;
pub mod service;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use error::{classify, extract_error_body, ErrorBody, GenerationError};
pub use gemini::GeminiClient;
pub use prompt::PromptBuilder;
pub use service::{
    ChunkReceiver, GenerationRequest, GenerationService, ServiceError, CHUNK_CHANNEL_CAPACITY,
};
