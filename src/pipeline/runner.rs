//! Generation pipeline — drives one audio clip to a committed press alert.
//!
//! [`GenerationPipeline`] owns the stores, the generation backend and the
//! [`Session`].  Requests are handled one at a time (`submit` takes
//! `&mut self`), so the stores only ever see a single writer.
//!
//! # Pipeline flow
//!
//! ```text
//! submit(payload)
//!   ├─ over the size limit      → Failed(PayloadTooLarge)        no network
//!   ├─ no stored credential     → park, AwaitingCredential       no network
//!   └─ run
//!        ├─ progress.start, style.load, prompt.build           [Dispatching]
//!        ├─ service.open_stream                                [Streaming]
//!        │    └─ each chunk → draft += chunk (first: progress.stop(true))
//!        ├─ closed, draft non-empty → history.append          [Committed]
//!        └─ error / empty draft → classify                     [Failed]
//!             └─ Auth → re-park payload                        [AwaitingCredential]
//!
//! provide_credential(key) → store, take the parked request, run it once
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc::UnboundedSender;

use crate::audio::{AudioPayload, MAX_PAYLOAD_BYTES};
use crate::config::AppConfig;
use crate::generation::{
    classify, GeminiClient, GenerationError, GenerationRequest, GenerationService, PromptBuilder,
};
use crate::store::{
    AlertRecord, Credential, CredentialError, CredentialStore, HistoryStore, SharedSource,
    SharedStore, StyleStore,
};

use super::progress::{ProgressEstimator, DEFAULT_TICK};
use super::state::{PendingRequest, PipelineEvent, PipelineState, Session, View};

// ---------------------------------------------------------------------------
// SubmitOutcome
// ---------------------------------------------------------------------------

/// How a submission (or a replay) ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Parked; supply a key with
    /// [`provide_credential`](GenerationPipeline::provide_credential).
    AwaitingCredential,
    Committed(AlertRecord),
    Failed(GenerationError),
}

// ---------------------------------------------------------------------------
// GenerationPipeline
// ---------------------------------------------------------------------------

/// Drives the audio → press-alert pipeline.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use press_alert::audio::AudioPayload;
/// use press_alert::config::AppConfig;
/// use press_alert::pipeline::{GenerationPipeline, SubmitOutcome};
/// use press_alert::store::MemoryStore;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let mut pipeline = GenerationPipeline::from_config(&config, Arc::new(MemoryStore::new()));
///
/// let payload = AudioPayload::new(std::fs::read("clip1.wav").unwrap(), None, "clip1.wav");
/// if let SubmitOutcome::AwaitingCredential = pipeline.submit(payload).await {
///     let outcome = pipeline.provide_credential("AIza-example-key").await.unwrap();
///     println!("{outcome:?}");
/// }
/// # }
/// ```
pub struct GenerationPipeline {
    service: Arc<dyn GenerationService>,
    credentials: CredentialStore,
    style: StyleStore,
    history: HistoryStore,
    prompt: PromptBuilder,
    progress: ProgressEstimator,
    events: Option<UnboundedSender<PipelineEvent>>,
    max_payload_bytes: u64,
    session: Session,
}

impl GenerationPipeline {
    pub fn new(
        service: Arc<dyn GenerationService>,
        credentials: CredentialStore,
        style: StyleStore,
        history: HistoryStore,
        prompt: PromptBuilder,
    ) -> Self {
        Self {
            service,
            credentials,
            style,
            history,
            prompt,
            progress: ProgressEstimator::new(DEFAULT_TICK),
            events: None,
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            session: Session::default(),
        }
    }

    /// Wire a [`GeminiClient`] and all stores from `config` over `kv`.
    pub fn from_config(config: &AppConfig, kv: SharedStore) -> Self {
        let service = Arc::new(GeminiClient::from_config(&config.generation));
        let credentials = CredentialStore::with_min_len(kv.clone(), config.limits.min_credential_len);
        let style = StyleStore::new(kv.clone())
            .with_shared_source(config.style.shared_source.as_deref().map(SharedSource::parse));
        let history = HistoryStore::load(kv, config.limits.history_capacity);

        Self::new(
            service,
            credentials,
            style,
            history,
            PromptBuilder::new(&config.locale),
        )
        .with_max_payload_bytes(config.limits.max_payload_bytes)
        .with_progress_tick(Duration::from_millis(config.progress.tick_ms))
    }

    /// Publish [`PipelineEvent`]s (progress readings included) on `events`.
    pub fn with_events(mut self, events: UnboundedSender<PipelineEvent>) -> Self {
        self.progress = ProgressEstimator::new(self.progress.tick()).with_events(events.clone());
        self.events = Some(events);
        self
    }

    pub fn with_max_payload_bytes(mut self, max: u64) -> Self {
        self.max_payload_bytes = max;
        self
    }

    pub fn with_progress_tick(mut self, tick: Duration) -> Self {
        let mut progress = ProgressEstimator::new(tick);
        if let Some(tx) = &self.events {
            progress = progress.with_events(tx.clone());
        }
        self.progress = progress;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> PipelineState {
        self.session.state
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.session.pending.as_ref()
    }

    /// Text in the result area.
    pub fn current_text(&self) -> &str {
        &self.session.draft
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn style(&self) -> &StyleStore {
        &self.style
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Mutable history for `reorder` / `clear`.
    pub fn history_mut(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    pub fn progress(&self) -> &ProgressEstimator {
        &self.progress
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Generate an alert from `payload`.
    ///
    /// Never returns an error: every failure is classified and reported as
    /// [`SubmitOutcome::Failed`] (and a [`PipelineEvent::Failed`]).
    pub async fn submit(&mut self, payload: AudioPayload) -> SubmitOutcome {
        if let Err(e) = payload.check_size(self.max_payload_bytes) {
            log::warn!("pipeline: rejected {}: {e}", payload.display_name());
            return self.fail(e.into(), None);
        }

        match self.credentials.get() {
            Some(credential) => self.run(credential, payload).await,
            None => self.park(payload),
        }
    }

    /// Store a credential and replay the parked request, if any.
    ///
    /// Returns `Ok(None)` when nothing was parked.  An invalid value is
    /// rejected without touching the parked request.
    pub async fn provide_credential(
        &mut self,
        value: &str,
    ) -> Result<Option<SubmitOutcome>, CredentialError> {
        let credential = match self.credentials.set(value) {
            Ok(credential) => credential,
            Err(e) => {
                if let CredentialError::TooShort { min } = e {
                    self.emit(PipelineEvent::Failed(GenerationError::InvalidCredential { min }));
                }
                return Err(e);
            }
        };
        self.emit(PipelineEvent::Notice {
            message: "API key saved".into(),
            transient: true,
        });

        let Some(pending) = self.session.pending.take() else {
            if self.session.state == PipelineState::AwaitingCredential {
                self.session.state = PipelineState::Idle;
            }
            return Ok(None);
        };

        log::info!("pipeline: replaying parked request {}", pending.display_name());
        Ok(Some(self.run(credential, pending.payload).await))
    }

    /// Drop the parked request without running it.
    pub fn cancel_pending(&mut self) -> Option<PendingRequest> {
        let pending = self.session.pending.take();
        if self.session.state == PipelineState::AwaitingCredential {
            self.session.state = PipelineState::Idle;
        }
        if let Some(p) = &pending {
            log::debug!("pipeline: dropped parked request {}", p.display_name());
        }
        pending
    }

    /// Put the history alert with `id` in the result area.
    ///
    /// Returns `false` when no alert has that id.
    pub fn show(&mut self, id: &str) -> bool {
        let Some(content) = self.history.find(id).map(|r| r.content().to_string()) else {
            return false;
        };
        self.session.draft = content.clone();
        self.session.view = View::Result;
        self.emit(PipelineEvent::DraftUpdated(content));
        true
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn park(&mut self, payload: AudioPayload) -> SubmitOutcome {
        let source_name = payload.display_name().to_string();
        if self.session.pending.is_some() {
            log::debug!("pipeline: replacing parked request with {source_name}");
        }
        log::info!("pipeline: no API key stored; parking {source_name}");

        self.session.pending = Some(PendingRequest { payload });
        self.session.state = PipelineState::AwaitingCredential;
        self.emit(PipelineEvent::CredentialRequired { source_name });
        SubmitOutcome::AwaitingCredential
    }

    async fn run(&mut self, credential: Credential, payload: AudioPayload) -> SubmitOutcome {
        let source_name = payload.display_name().to_string();

        // ── 1. Dispatch ─────────────────────────────────────────────────
        self.session.state = PipelineState::Dispatching;
        self.session.view = View::Loading;
        self.session.draft.clear();
        self.session.last_error = None;
        self.emit(PipelineEvent::Loading {
            source_name: source_name.clone(),
        });
        self.progress.start();

        let style = self.style.load().await;
        let request = GenerationRequest {
            audio: payload.data().clone(),
            mime_type: payload.mime_type(),
            prompt: self.prompt.build(Local::now().date_naive(), &style),
        };
        log::debug!(
            "pipeline: dispatching {source_name} ({} bytes, {}, style {} chars)",
            payload.len(),
            request.mime_type,
            style.len()
        );

        let mut chunks = match self.service.open_stream(&credential, request).await {
            Ok(rx) => rx,
            Err(e) => return self.fail(classify(&e), Some(payload)),
        };

        // ── 2. Stream ───────────────────────────────────────────────────
        self.session.state = PipelineState::Streaming;
        while let Some(next) = chunks.recv().await {
            match next {
                Ok(chunk) if chunk.is_empty() => {}
                Ok(chunk) => {
                    if self.session.draft.is_empty() {
                        self.progress.stop(true);
                        self.session.view = View::Result;
                    }
                    self.session.draft.push_str(&chunk);
                    self.emit(PipelineEvent::DraftUpdated(self.session.draft.clone()));
                }
                Err(e) => return self.fail(classify(&e), Some(payload)),
            }
        }

        // ── 3. Commit ───────────────────────────────────────────────────
        if self.session.draft.is_empty() {
            return self.fail(GenerationError::EmptyResult, None);
        }
        self.commit(source_name)
    }

    fn commit(&mut self, source_name: String) -> SubmitOutcome {
        let record = AlertRecord::new(self.session.draft.clone(), source_name);
        if let Err(e) = self.history.append(record.clone()) {
            log::error!("pipeline: alert generated but not saved to history: {e}");
        }

        log::info!(
            "pipeline: committed alert {} ({} chars)",
            record.id(),
            record.content().len()
        );
        self.session.pending = None;
        self.session.state = PipelineState::Committed;
        self.session.view = View::Result;
        self.emit(PipelineEvent::Committed(record.clone()));
        SubmitOutcome::Committed(record)
    }

    /// `payload` is re-parked when the failure calls for a new credential.
    fn fail(&mut self, err: GenerationError, payload: Option<AudioPayload>) -> SubmitOutcome {
        if err.is_local() {
            log::warn!("pipeline: rejected before dispatch: {err}");
        } else {
            log::error!("pipeline error: {err}");
        }

        self.progress.stop(false);
        self.session.view = View::Empty;
        self.session.draft.clear();
        self.session.last_error = Some(err.clone());
        self.emit(PipelineEvent::Failed(err.clone()));

        match payload {
            Some(payload) if err.requires_credential() => {
                let source_name = payload.display_name().to_string();
                self.session.pending = Some(PendingRequest { payload });
                self.session.state = PipelineState::AwaitingCredential;
                self.emit(PipelineEvent::CredentialRequired { source_name });
            }
            _ => {
                self.session.pending = None;
                self.session.state = PipelineState::Failed;
            }
        }
        SubmitOutcome::Failed(err)
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;
    use crate::generation::{ChunkReceiver, ServiceError};
    use crate::pipeline::progress::ProgressPhase;
    use crate::store::{MemoryStore, DEFAULT_HISTORY_CAPACITY};

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    enum Script {
        Chunks(Vec<Result<String, ServiceError>>),
        OpenError(ServiceError),
    }

    /// Backend that plays one scripted response per call.  Calls beyond the
    /// script get an empty stream.
    #[derive(Default)]
    struct ScriptedService {
        script: Mutex<VecDeque<Script>>,
        calls: AtomicUsize,
        last_request: Mutex<Option<GenerationRequest>>,
        last_key: Mutex<Option<String>>,
    }

    impl ScriptedService {
        fn new(script: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                ..Self::default()
            })
        }

        fn chunks(chunks: &[&str]) -> Script {
            Script::Chunks(chunks.iter().map(|c| Ok(c.to_string())).collect())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> GenerationRequest {
            self.last_request.lock().unwrap().clone().expect("no request")
        }
    }

    #[async_trait]
    impl GenerationService for ScriptedService {
        async fn open_stream(
            &self,
            credential: &Credential,
            request: GenerationRequest,
        ) -> Result<ChunkReceiver, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request);
            *self.last_key.lock().unwrap() = Some(credential.expose().to_string());

            let step = self.script.lock().unwrap().pop_front();
            match step.unwrap_or(Script::Chunks(Vec::new())) {
                Script::OpenError(e) => Err(e),
                Script::Chunks(items) => {
                    let (tx, rx) = mpsc::channel(items.len().max(1));
                    for item in items {
                        tx.try_send(item).unwrap();
                    }
                    Ok(rx)
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    const KEY: &str = "AIza-test-key";

    fn auth_error() -> ServiceError {
        ServiceError::Api {
            status: 403,
            body: r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#
                .into(),
        }
    }

    fn clip() -> AudioPayload {
        AudioPayload::new(vec![7u8; 2048], Some("audio/wav".into()), "clip1.wav")
    }

    fn make_pipeline(service: Arc<ScriptedService>, kv: SharedStore) -> GenerationPipeline {
        GenerationPipeline::new(
            service,
            CredentialStore::new(kv.clone()),
            StyleStore::new(kv.clone()),
            HistoryStore::load(kv, DEFAULT_HISTORY_CAPACITY),
            PromptBuilder::new("es"),
        )
    }

    fn with_key(kv: &SharedStore) {
        CredentialStore::new(kv.clone()).set(KEY).unwrap();
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn missing_credential_parks_without_network() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        let service = ScriptedService::new(vec![]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pipeline = make_pipeline(service.clone(), kv).with_events(tx);

        let outcome = pipeline.submit(clip()).await;

        assert_eq!(outcome, SubmitOutcome::AwaitingCredential);
        assert_eq!(pipeline.state(), PipelineState::AwaitingCredential);
        assert_eq!(pipeline.pending().unwrap().payload, clip());
        assert_eq!(pipeline.pending().unwrap().display_name(), "clip1.wav");
        assert_eq!(service.calls(), 0);
        assert!(pipeline.history().is_empty());
        assert_eq!(
            drain(&mut rx),
            [PipelineEvent::CredentialRequired {
                source_name: "clip1.wav".into()
            }]
        );
    }

    #[tokio::test]
    async fn second_park_replaces_first() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        let mut pipeline = make_pipeline(ScriptedService::new(vec![]), kv);

        pipeline.submit(clip()).await;
        let other = AudioPayload::new(vec![1u8; 10], None, "otro.mp3");
        pipeline.submit(other.clone()).await;

        assert_eq!(pipeline.pending().unwrap().payload, other);
    }

    #[tokio::test]
    async fn chunks_are_concatenated_and_committed() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        with_key(&kv);
        let service = ScriptedService::new(vec![ScriptedService::chunks(&["Hola ", "mundo"])]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pipeline = make_pipeline(service.clone(), kv.clone()).with_events(tx);

        let outcome = pipeline.submit(clip()).await;

        let SubmitOutcome::Committed(record) = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert_eq!(record.content(), "Hola mundo");
        assert_eq!(record.source_name(), "clip1.wav");
        assert_eq!(pipeline.history().len(), 1);
        assert_eq!(pipeline.state(), PipelineState::Committed);
        assert_eq!(pipeline.session().view, View::Result);
        assert_eq!(pipeline.current_text(), "Hola mundo");
        assert_eq!(service.last_key.lock().unwrap().as_deref(), Some(KEY));

        // Persisted, so a fresh load sees it.
        assert_eq!(HistoryStore::load(kv, DEFAULT_HISTORY_CAPACITY).len(), 1);

        let events = drain(&mut rx);
        let complete_at = events
            .iter()
            .position(|e| matches!(e, PipelineEvent::Progress(s) if s.phase == ProgressPhase::Complete))
            .expect("progress completed");
        let drafts: Vec<_> = events
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e {
                PipelineEvent::DraftUpdated(text) => Some((i, text.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(drafts.iter().map(|(_, t)| *t).collect::<Vec<_>>(), ["Hola ", "Hola mundo"]);
        assert!(complete_at < drafts[0].0);
        assert!(matches!(events.last(), Some(PipelineEvent::Committed(r)) if r.id() == record.id()));
        assert!(!pipeline.progress().is_running());
    }

    #[tokio::test]
    async fn empty_stream_is_an_error() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        with_key(&kv);
        let service = ScriptedService::new(vec![ScriptedService::chunks(&["", ""])]);
        let mut pipeline = make_pipeline(service, kv);

        let outcome = pipeline.submit(clip()).await;

        assert_eq!(outcome, SubmitOutcome::Failed(GenerationError::EmptyResult));
        assert!(pipeline.history().is_empty());
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert_eq!(pipeline.session().view, View::Empty);
        assert!(pipeline.pending().is_none());
        assert_eq!(pipeline.progress().snapshot().phase, ProgressPhase::Failed);
    }

    #[tokio::test]
    async fn stream_closed_without_chunks_is_an_error() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        with_key(&kv);
        let service = ScriptedService::new(vec![ScriptedService::chunks(&[])]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pipeline = make_pipeline(service.clone(), kv).with_events(tx);

        let outcome = pipeline.submit(clip()).await;

        assert_eq!(outcome, SubmitOutcome::Failed(GenerationError::EmptyResult));
        assert_eq!(service.calls(), 1);
        assert!(pipeline.history().is_empty());
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert_eq!(pipeline.session().view, View::Empty);
        assert!(pipeline.current_text().is_empty());

        let events = drain(&mut rx);
        assert!(!events.iter().any(|e| matches!(e, PipelineEvent::DraftUpdated(_))));
        assert!(events.contains(&PipelineEvent::Failed(GenerationError::EmptyResult)));
    }

    #[tokio::test]
    async fn oversized_payload_never_reaches_network() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        with_key(&kv);
        let service = ScriptedService::new(vec![]);
        let mut pipeline = make_pipeline(service.clone(), kv);

        let big = AudioPayload::new(vec![0u8; 16 * 1024 * 1024], None, "largo.wav");
        let outcome = pipeline.submit(big).await;

        assert!(matches!(
            outcome,
            SubmitOutcome::Failed(GenerationError::PayloadTooLarge { max, .. }) if max == MAX_PAYLOAD_BYTES
        ));
        assert_eq!(service.calls(), 0);
        assert!(pipeline.pending().is_none());
    }

    #[tokio::test]
    async fn oversized_payload_checked_before_credential() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        let mut pipeline = make_pipeline(ScriptedService::new(vec![]), kv).with_max_payload_bytes(100);

        let outcome = pipeline.submit(clip()).await;

        assert!(matches!(outcome, SubmitOutcome::Failed(GenerationError::PayloadTooLarge { .. })));
        assert!(pipeline.pending().is_none());
    }

    #[tokio::test]
    async fn auth_failure_on_open_reparks_payload() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        with_key(&kv);
        let service = ScriptedService::new(vec![Script::OpenError(auth_error())]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pipeline = make_pipeline(service, kv).with_events(tx);

        let outcome = pipeline.submit(clip()).await;

        assert_eq!(
            outcome,
            SubmitOutcome::Failed(GenerationError::Auth("API key not valid".into()))
        );
        assert_eq!(pipeline.state(), PipelineState::AwaitingCredential);
        assert_eq!(pipeline.pending().unwrap().payload, clip());
        // Stored key is left alone.
        assert_eq!(pipeline.credentials().get().unwrap().expose(), KEY);

        let events = drain(&mut rx);
        assert!(matches!(
            events.last(),
            Some(PipelineEvent::CredentialRequired { source_name }) if source_name == "clip1.wav"
        ));
    }

    #[tokio::test]
    async fn auth_failure_mid_stream_reparks_and_replays_once() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        with_key(&kv);
        let service = ScriptedService::new(vec![
            Script::Chunks(vec![
                Ok("parcial".into()),
                Err(ServiceError::Stream(
                    r#"{"error":{"code":401,"message":"expired","status":"UNAUTHENTICATED"}}"#.into(),
                )),
            ]),
            ScriptedService::chunks(&["*ALERTA*"]),
        ]);
        let mut pipeline = make_pipeline(service.clone(), kv);

        let outcome = pipeline.submit(clip()).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(GenerationError::Auth(_))));
        assert_eq!(pipeline.pending().unwrap().payload, clip());
        assert!(pipeline.history().is_empty());
        assert!(pipeline.current_text().is_empty());

        let replay = pipeline.provide_credential("  AIza-new-key  ").await.unwrap();

        assert!(matches!(replay, Some(SubmitOutcome::Committed(ref r)) if r.content() == "*ALERTA*"));
        assert_eq!(service.calls(), 2);
        assert_eq!(service.last_key.lock().unwrap().as_deref(), Some("AIza-new-key"));
        assert_eq!(service.last_request().audio, clip().data().clone());
        assert!(pipeline.pending().is_none());
        assert_eq!(pipeline.history().len(), 1);
    }

    #[tokio::test]
    async fn provided_credential_replays_parked_request() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        let service = ScriptedService::new(vec![ScriptedService::chunks(&["Texto"])]);
        let mut pipeline = make_pipeline(service.clone(), kv);

        pipeline.submit(clip()).await;
        let replay = pipeline.provide_credential(KEY).await.unwrap();

        assert!(matches!(replay, Some(SubmitOutcome::Committed(_))));
        assert_eq!(service.calls(), 1);
        assert!(pipeline.pending().is_none());
        assert_eq!(pipeline.history().get(0).unwrap().source_name(), "clip1.wav");
    }

    #[tokio::test]
    async fn short_credential_is_rejected_and_request_stays_parked() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        let service = ScriptedService::new(vec![]);
        let mut pipeline = make_pipeline(service.clone(), kv);
        pipeline.submit(clip()).await;

        let err = pipeline.provide_credential("abc").await.unwrap_err();

        assert!(matches!(err, CredentialError::TooShort { min: 6 }));
        assert_eq!(service.calls(), 0);
        assert_eq!(pipeline.state(), PipelineState::AwaitingCredential);
        assert!(pipeline.pending().is_some());
        assert!(pipeline.credentials().get().is_none());
    }

    #[tokio::test]
    async fn credential_without_parked_request_returns_none() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        let mut pipeline = make_pipeline(ScriptedService::new(vec![]), kv);

        assert!(pipeline.provide_credential(KEY).await.unwrap().is_none());
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn quota_failure_is_reported_not_retried() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        with_key(&kv);
        let service = ScriptedService::new(vec![Script::OpenError(ServiceError::Api {
            status: 429,
            body: r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#
                .into(),
        })]);
        let mut pipeline = make_pipeline(service.clone(), kv);

        let outcome = pipeline.submit(clip()).await;

        assert_eq!(
            outcome,
            SubmitOutcome::Failed(GenerationError::Quota("Quota exceeded".into()))
        );
        assert_eq!(service.calls(), 1);
        assert!(pipeline.pending().is_none());
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert_eq!(
            pipeline.session().last_error,
            Some(GenerationError::Quota("Quota exceeded".into()))
        );
    }

    #[tokio::test]
    async fn request_carries_style_and_resolved_type() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        with_key(&kv);
        StyleStore::new(kv.clone()).save("*EJEMPLO DE ESTILO*").unwrap();
        let service = ScriptedService::new(vec![ScriptedService::chunks(&["ok"])]);
        let mut pipeline = make_pipeline(service.clone(), kv);

        let payload = AudioPayload::new(vec![1u8; 64], Some("application/octet-stream".into()), "nota.m4a");
        pipeline.submit(payload).await;

        let request = service.last_request();
        assert_eq!(request.mime_type, "audio/mp4");
        assert!(request.prompt.contains("*EJEMPLO DE ESTILO*"));
        let today = PromptBuilder::new("es").format_date(Local::now().date_naive());
        assert!(request.prompt.contains(&today));
    }

    #[tokio::test]
    async fn cancel_pending_returns_to_idle() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        let mut pipeline = make_pipeline(ScriptedService::new(vec![]), kv);
        pipeline.submit(clip()).await;

        let dropped = pipeline.cancel_pending().unwrap();

        assert_eq!(dropped.display_name(), "clip1.wav");
        assert!(pipeline.pending().is_none());
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(pipeline.cancel_pending().is_none());
    }

    #[tokio::test]
    async fn show_puts_history_alert_in_result_area() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        with_key(&kv);
        let service = ScriptedService::new(vec![
            ScriptedService::chunks(&["primero"]),
            ScriptedService::chunks(&["segundo"]),
        ]);
        let mut pipeline = make_pipeline(service, kv);
        pipeline.submit(clip()).await;
        pipeline.submit(clip()).await;

        let first_id = pipeline.history().get(1).unwrap().id().to_string();
        assert!(pipeline.show(&first_id));
        assert_eq!(pipeline.current_text(), "primero");
        assert!(!pipeline.show("missing"));
    }

    #[tokio::test]
    async fn history_commands_through_pipeline() {
        let kv: SharedStore = Arc::new(MemoryStore::new());
        with_key(&kv);
        let service = ScriptedService::new(vec![
            ScriptedService::chunks(&["a"]),
            ScriptedService::chunks(&["b"]),
        ]);
        let mut pipeline = make_pipeline(service, kv);
        pipeline.submit(clip()).await;
        pipeline.submit(clip()).await;

        assert!(pipeline.history_mut().reorder(0, 1).unwrap());
        assert_eq!(pipeline.history().get(0).unwrap().content(), "a");
        pipeline.history_mut().clear().unwrap();
        assert!(pipeline.history().is_empty());
    }
}
