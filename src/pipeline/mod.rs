//! Pipeline module for press-alert.
//!
//! This module wires audio payload → prompt → streamed generation → history
//! and exposes the session state that front-ends render.
//!
//! # Architecture
//!
//! ```text
//! AudioPayload
//!        │
//!        ▼
//! GenerationPipeline::submit()   ← one request at a time (&mut self)
//!        │
//!        ├─ CredentialStore::get    none → park + CredentialRequired
//!        ├─ StyleStore::load + PromptBuilder::build
//!        ├─ GenerationService::open_stream   chunks → DraftUpdated
//!        │        └─ ProgressEstimator ticks until the first chunk
//!        └─ HistoryStore::append → Committed
//!
//! PipelineEvent (unbounded mpsc) ───▶ front-end renderer
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use press_alert::audio::{AudioPayload, MAX_PAYLOAD_BYTES};
//! use press_alert::config::{AppConfig, AppPaths};
//! use press_alert::pipeline::{GenerationPipeline, PipelineEvent};
//! use press_alert::store::FileStore;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let kv = Arc::new(FileStore::new(AppPaths::new().data_dir));
//!     let (tx, mut rx) = mpsc::unbounded_channel();
//!     let mut pipeline = GenerationPipeline::from_config(&config, kv).with_events(tx);
//!
//!     tokio::spawn(async move {
//!         while let Some(event) = rx.recv().await {
//!             if let PipelineEvent::DraftUpdated(text) = event {
//!                 println!("{text}");
//!             }
//!         }
//!     });
//!
//!     let payload = AudioPayload::from_file("clip1.wav".as_ref(), MAX_PAYLOAD_BYTES)
//!         .await
//!         .unwrap();
//!     let outcome = pipeline.submit(payload).await;
//!     println!("{outcome:?}");
//! }
//! ```

pub mod progress;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use progress::{ProgressEstimator, ProgressPhase, ProgressSnapshot};
pub use runner::{GenerationPipeline, SubmitOutcome};
pub use state::{PendingRequest, PipelineEvent, PipelineState, Session, View};
