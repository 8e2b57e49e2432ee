//! Audio input boundary — the payload handed to the pipeline.
//!
//! Capture itself lives outside this crate; callers hand over whole clips
//! (an uploaded file, or a finished microphone recording) as
//! [`AudioPayload`]s.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use press_alert::audio::{AudioPayload, MAX_PAYLOAD_BYTES};
//!
//! # async fn example() {
//! let payload = AudioPayload::from_file(Path::new("clip1.wav"), MAX_PAYLOAD_BYTES)
//!     .await
//!     .unwrap();
//! println!("{} bytes, {}", payload.len(), payload.mime_type());
//! # }
//! ```

pub mod mime;
pub mod payload;

pub use mime::{resolve_mime_type, DEFAULT_AUDIO_TYPE, GENERIC_BINARY_TYPE};
pub use payload::{
    AudioPayload, PayloadError, DEFAULT_DISPLAY_NAME, DIRECT_CAPTURE_NAME, MAX_PAYLOAD_BYTES,
};
