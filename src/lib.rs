//! press-alert — turns recorded institutional audio into press alerts.
//!
//! An audio clip is sent, together with a dated prompt biased by the
//! operator's style examples, to a streaming generation service.  The text
//! is streamed into a draft, committed to a bounded history, and can be
//! copied to the clipboard.
//!
//! * [`audio`] — payloads and content-type resolution.
//! * [`store`] — credential, style examples and alert history.
//! * [`generation`] — prompt builder, service trait, Gemini backend, errors.
//! * [`pipeline`] — the generation state machine and progress estimator.
//! * [`app`] — the command-line front-end.

pub mod app;
pub mod audio;
pub mod clipboard;
pub mod config;
pub mod generation;
pub mod pipeline;
pub mod store;

#[cfg(test)]
mod test_support;
