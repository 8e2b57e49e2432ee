//! `GeminiClient` — streams press alerts from the Generative Language API.
//!
//! One request carries the audio inline (base64) followed by the prompt
//! text.  The response is consumed as server-sent events
//! (`:streamGenerateContent?alt=sse`): a spawned task decodes `data:` events,
//! pulls the text parts out of each, and forwards them in order over the
//! chunk channel.  The task ends, and the connection is released, when the
//! body ends, an error is forwarded, or the receiver is dropped.

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::config::GenerationConfig;
use crate::store::Credential;

use super::service::{
    ChunkReceiver, GenerationRequest, GenerationService, ServiceError, CHUNK_CHANNEL_CAPACITY,
};

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// Streaming client for `models/{model}:streamGenerateContent`.
///
/// All connection details (`base_url`, `model`, timeout) come from the
/// [`GenerationConfig`]; the credential is supplied per call.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GenerationConfig,
}

impl GeminiClient {
    /// Build a client from config.
    ///
    /// The HTTP client carries the whole-request timeout from
    /// `config.timeout_secs`.  A default client is used if the builder fails.
    pub fn from_config(config: &GenerationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let audio = base64::engine::general_purpose::STANDARD.encode(&request.audio);

        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inline_data": { "mime_type": request.mime_type, "data": audio } },
                    { "text": request.prompt }
                ]
            }]
        });

        if let Some(temperature) = self.config.temperature {
            body["generationConfig"] = serde_json::json!({ "temperature": temperature });
        }
        body
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn open_stream(
        &self,
        credential: &Credential,
        request: GenerationRequest,
    ) -> Result<ChunkReceiver, ServiceError> {
        log::debug!(
            "gemini: dispatching {} bytes ({}) to model {}",
            request.audio.len(),
            request.mime_type,
            self.config.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", credential.expose())
            .json(&self.request_body(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let (tx, rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        tokio::spawn(forward_events(response.bytes_stream(), tx));
        Ok(rx)
    }
}

// ---------------------------------------------------------------------------
// SSE forwarding
// ---------------------------------------------------------------------------

async fn forward_events<S>(body: S, tx: mpsc::Sender<Result<String, ServiceError>>)
where
    S: Stream<Item = reqwest::Result<Bytes>>,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = SseDecoder::default();

    while let Some(next) = body.next().await {
        let bytes = match next {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx.send(Err(e.into())).await;
                return;
            }
        };

        for event in decoder.push(&bytes) {
            if !forward_event(&event, &tx).await {
                return;
            }
        }
    }

    if let Some(event) = decoder.finish() {
        forward_event(&event, &tx).await;
    }
    log::debug!("gemini: stream closed");
}

/// Returns `false` once the stream should stop (error sent or receiver gone).
async fn forward_event(data: &str, tx: &mpsc::Sender<Result<String, ServiceError>>) -> bool {
    match parse_event(data) {
        Ok(Some(text)) => tx.send(Ok(text)).await.is_ok(),
        Ok(None) => true,
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            false
        }
    }
}

/// Text carried by one event, or the error it reports.
///
/// Thought-summary parts are skipped.  Events without text (usage metadata,
/// finish markers) yield `Ok(None)`.
pub(crate) fn parse_event(data: &str) -> Result<Option<String>, ServiceError> {
    let json: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| ServiceError::Stream(format!("malformed event ({e}): {data}")))?;

    if json.get("error").is_some() {
        return Err(ServiceError::Stream(json.to_string()));
    }

    let text: String = json["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter(|p| !p["thought"].as_bool().unwrap_or(false))
                .filter_map(|p| p["text"].as_str())
                .collect()
        })
        .unwrap_or_default();

    Ok((!text.is_empty()).then_some(text))
}

// ---------------------------------------------------------------------------
// SseDecoder
// ---------------------------------------------------------------------------

/// Incremental server-sent-events decoder.
///
/// Network chunks can split lines (and UTF-8 sequences) anywhere, so bytes
/// are buffered until a full line is available.  Consecutive `data:` lines
/// are joined with `\n`; a blank line ends the event.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed bytes; returns the data of every event completed by them.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.take_event() {
                    events.push(event);
                }
            } else if let Some(data) = line.strip_prefix("data:") {
                self.data.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
            // `event:`, `id:`, `retry:` and `:` comments carry nothing we use.
        }
        events
    }

    /// Flush a trailing event that was not followed by a blank line.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            let rest = String::from_utf8_lossy(&rest);
            let rest = rest.trim_end_matches(['\n', '\r']);
            if let Some(data) = rest.strip_prefix("data:") {
                self.data.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
        }
        self.take_event()
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data).join("\n"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
