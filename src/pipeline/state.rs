//! Pipeline state machine and the per-pipeline session.
//!
//! [`PipelineState`] is the generation lifecycle.  [`Session`] holds
//! everything that changes between requests (the parked request, the draft
//! being streamed, the last failure) and is owned by the pipeline instance;
//! front-ends read it through [`GenerationPipeline::session`] or follow
//! [`PipelineEvent`]s.
//!
//! [`GenerationPipeline::session`]: super::GenerationPipeline::session

use crate::audio::AudioPayload;
use crate::generation::GenerationError;
use crate::store::AlertRecord;

use super::progress::ProgressSnapshot;

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of the generation pipeline.
///
/// ```text
/// Idle ──no credential──▶ AwaitingCredential ──key provided──▶ Dispatching
/// Idle ──submit──▶ Dispatching ──stream opened──▶ Streaming ──closed──▶ Committed
/// Dispatching / Streaming ──error──▶ Failed
/// Dispatching / Streaming ──auth error──▶ AwaitingCredential
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipelineState {
    #[default]
    Idle,
    /// A request is parked until the operator supplies a credential.
    AwaitingCredential,
    /// Building the request and opening the stream.
    Dispatching,
    /// Receiving text.
    Streaming,
    /// The last request produced an alert.
    Committed,
    /// The last request failed; the error is in [`Session::last_error`].
    Failed,
}

impl PipelineState {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::AwaitingCredential => "Waiting for API key",
            PipelineState::Dispatching => "Sending",
            PipelineState::Streaming => "Receiving",
            PipelineState::Committed => "Done",
            PipelineState::Failed => "Error",
        }
    }
}

/// What the result area shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    /// Placeholder, nothing generated yet (or the last attempt failed).
    #[default]
    Empty,
    /// Progress bar.
    Loading,
    /// Generated text.
    Result,
}

// ---------------------------------------------------------------------------
// PendingRequest
// ---------------------------------------------------------------------------

/// A submission parked while a credential is collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub payload: AudioPayload,
}

impl PendingRequest {
    pub fn display_name(&self) -> &str {
        self.payload.display_name()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Mutable context of one pipeline instance.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: PipelineState,
    pub view: View,
    /// At most one parked request.
    pub pending: Option<PendingRequest>,
    /// Streamed text of the current request, or the alert being shown.
    pub draft: String,
    pub last_error: Option<GenerationError>,
}

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// Presentation updates, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Open the credential prompt for the parked request.
    CredentialRequired { source_name: String },
    /// A request was dispatched; show the loading view.
    Loading { source_name: String },
    Progress(ProgressSnapshot),
    /// Full draft text so far (replace, not append).
    DraftUpdated(String),
    Committed(AlertRecord),
    Failed(GenerationError),
    /// Informational message; `transient` ones may be dismissed automatically.
    Notice { message: String, transient: bool },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
