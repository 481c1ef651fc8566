//! Streaming recognition over WebSocket.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  send_audio()   │────▶│  commands (mpsc) │────▶│  WebSocket Task │
//! │  finish()       │     └──────────────────┘     └────────┬────────┘
//! └─────────────────┘                                       │
//!                         ┌──────────────────┐              │
//!                         │  events (mpsc)   │◀─────────────┘
//!                         └────────┬─────────┘
//!                                  │
//!                         ┌────────▼─────────┐
//!                         │  next_event()    │
//!                         └──────────────────┘
//! ```
//!
//! The connection carries the authenticator's `Authorization` header on the
//! handshake. The model and customization ids travel in the URL, every
//! other recognition parameter in the `start` message.

use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::HeaderMap;
use http::header::{HeaderValue, USER_AGENT};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::tungstenite::Error as TungsteniteError;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use super::messages::{ServerMessage, StartMessage, StopMessage};
use super::models::{SpeakerLabelsResult, SpeechRecognitionResults};
use super::recognize::RecognitionParams;
use super::{SpeechToTextV1, op};
use crate::core::error::{WatsonError, WatsonResult};
use crate::core::request::resolve_path;
use crate::core::telemetry::{ANALYTICS_HEADER, user_agent};

// =============================================================================
// Constants
// =============================================================================

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for the `listening` state after `start`.
const LISTEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Idle timeout. Resets after each message from the service, never on
/// outgoing audio.
pub const WS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// Options and events
// =============================================================================

/// Options for [`SpeechToTextV1::recognize_using_websocket`].
#[derive(Debug, Clone)]
pub struct RecognizeStreamOptions {
    /// Format of the audio frames, e.g. `audio/l16;rate=16000`.
    pub content_type: String,
    pub params: RecognitionParams,
    pub interim_results: Option<bool>,
    pub processing_metrics: Option<bool>,
    pub idle_timeout: Duration,
}

impl RecognizeStreamOptions {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            params: RecognitionParams::default(),
            interim_results: None,
            processing_metrics: None,
            idle_timeout: WS_MESSAGE_TIMEOUT,
        }
    }

    pub fn with_params(mut self, params: RecognitionParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_interim_results(mut self, enabled: bool) -> Self {
        self.interim_results = Some(enabled);
        self
    }

    pub fn with_processing_metrics(mut self, enabled: bool) -> Self {
        self.processing_metrics = Some(enabled);
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

/// Something that happened on a recognition stream.
#[derive(Debug, Clone)]
pub enum RecognizeEvent {
    /// The service is ready for audio.
    Listening,
    Results(SpeechRecognitionResults),
    SpeakerLabels(Vec<SpeakerLabelsResult>),
    /// Error reported by the service or the transport.
    Error(String),
    /// The stream ended; no further events follow.
    Closed,
}

enum Command {
    Audio(Bytes),
    Stop,
}

// =============================================================================
// RecognizeStream
// =============================================================================

/// An open streaming recognition.
pub struct RecognizeStream {
    commands: Option<mpsc::Sender<Command>>,
    events: mpsc::Receiver<RecognizeEvent>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for RecognizeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizeStream")
            .field("finished", &self.commands.is_none())
            .finish()
    }
}

impl RecognizeStream {
    /// Send one chunk of audio as a binary frame.
    pub async fn send_audio(&self, audio: Bytes) -> WatsonResult<()> {
        let Some(commands) = &self.commands else {
            return Err(WatsonError::WebSocket(
                "audio stream already finished".to_string(),
            ));
        };
        commands
            .send(Command::Audio(audio))
            .await
            .map_err(|_| WatsonError::WebSocket("connection closed".to_string()))
    }

    /// Next event; `None` once the stream has been fully drained.
    pub async fn next_event(&mut self) -> Option<RecognizeEvent> {
        self.events.recv().await
    }

    /// Signal the end of the audio. Final results and then
    /// [`RecognizeEvent::Closed`] follow on [`next_event`](Self::next_event).
    pub async fn finish(&mut self) -> WatsonResult<()> {
        if let Some(commands) = self.commands.take() {
            commands
                .send(Command::Stop)
                .await
                .map_err(|_| WatsonError::WebSocket("connection closed".to_string()))?;
        }
        Ok(())
    }

    /// Finish the audio and gather every result until the stream closes.
    pub async fn collect(mut self) -> WatsonResult<Vec<SpeechRecognitionResults>> {
        self.finish().await?;
        let mut collected = Vec::new();
        while let Some(event) = self.next_event().await {
            match event {
                RecognizeEvent::Results(results) => collected.push(results),
                RecognizeEvent::Error(message) => return Err(WatsonError::WebSocket(message)),
                RecognizeEvent::Closed => break,
                RecognizeEvent::Listening | RecognizeEvent::SpeakerLabels(_) => {}
            }
        }
        Ok(collected)
    }
}

impl Drop for RecognizeStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take()
            && !task.is_finished()
        {
            task.abort();
        }
    }
}

/// `wss://<host>/<path>/v1/recognize?model=...` for an `https://` service URL.
fn websocket_url(base: &Url, params: &RecognitionParams) -> WatsonResult<Url> {
    let mut url = resolve_path(base, "/v1/recognize", &[])?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(WatsonError::Configuration(format!(
                "Unsupported service URL scheme: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| WatsonError::Configuration(format!("Cannot use {scheme} for {base}")))?;

    {
        let mut query = url.query_pairs_mut();
        for (name, value) in [
            ("model", &params.model),
            ("language_customization_id", &params.language_customization_id),
            ("acoustic_customization_id", &params.acoustic_customization_id),
            ("base_model_version", &params.base_model_version),
            ("customization_id", &params.customization_id),
        ] {
            if let Some(value) = value {
                query.append_pair(name, value);
            }
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    Ok(url)
}

fn connect_error(err: TungsteniteError) -> WatsonError {
    match err {
        TungsteniteError::Http(response) if matches!(response.status().as_u16(), 401 | 403) => {
            WatsonError::Authentication(format!(
                "WebSocket handshake rejected with status {}",
                response.status()
            ))
        }
        other => WatsonError::WebSocket(format!("Failed to connect: {other}")),
    }
}

impl SpeechToTextV1 {
    /// Open a streaming recognition.
    ///
    /// Returns once the service reported `listening`; audio can be sent
    /// right away.
    pub async fn recognize_using_websocket(
        &self,
        options: RecognizeStreamOptions,
    ) -> WatsonResult<RecognizeStream> {
        WatsonError::require("content_type", &options.content_type)?;
        options.params.validate()?;

        let url = websocket_url(self.service.service_url(), &options.params)?;
        let operation = op("RecognizeUsingWebSocket");

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(user_agent()));
        headers.insert(
            ANALYTICS_HEADER,
            HeaderValue::from_str(&operation.analytics_header())
                .map_err(|e| WatsonError::Configuration(e.to_string()))?,
        );
        self.service.authenticator().authenticate(&mut headers).await?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| WatsonError::WebSocket(format!("Invalid WebSocket URL: {e}")))?;
        request.headers_mut().extend(headers);

        // A provider may already be installed by the application.
        let _ = rustls::crypto::ring::default_provider().install_default();

        debug!(operation = %operation, url = %url, "Opening WebSocket");

        let (ws_stream, _response) = timeout(CONNECT_TIMEOUT, connect_async(request))
            .await
            .map_err(|_| {
                WatsonError::WebSocket(format!(
                    "Connection timed out after {} seconds",
                    CONNECT_TIMEOUT.as_secs()
                ))
            })?
            .map_err(connect_error)?;

        let (mut ws_sink, mut ws_source) = ws_stream.split();

        let start = StartMessage::new(
            options.content_type,
            &options.params,
            options.interim_results,
            options.processing_metrics,
        );
        let start_json = serde_json::to_string(&start)
            .map_err(|e| WatsonError::WebSocket(format!("Failed to encode start message: {e}")))?;
        ws_sink
            .send(Message::Text(start_json.into()))
            .await
            .map_err(|e| WatsonError::WebSocket(format!("Failed to send start message: {e}")))?;

        // Wait for "listening" state message
        let listening = timeout(LISTEN_TIMEOUT, async {
            while let Some(msg) = ws_source.next().await {
                match msg {
                    Ok(Message::Text(text)) => match ServerMessage::parse(&text) {
                        Ok(message) if message.is_listening() => return Ok(()),
                        Ok(ServerMessage::Error(e)) => return Err(WatsonError::WebSocket(e.error)),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Unparseable message before listening"),
                    },
                    Ok(Message::Close(frame)) => {
                        return Err(WatsonError::WebSocket(format!(
                            "Closed before listening: {frame:?}"
                        )));
                    }
                    Ok(_) => {}
                    Err(e) => return Err(WatsonError::WebSocket(e.to_string())),
                }
            }
            Err(WatsonError::WebSocket(
                "Connection ended before listening".to_string(),
            ))
        })
        .await
        .map_err(|_| WatsonError::WebSocket("Did not receive listening state".to_string()))?;
        listening?;

        info!(operation = %operation, "Recognition stream listening");

        let (command_tx, mut command_rx) = mpsc::channel::<Command>(32);
        let (event_tx, event_rx) = mpsc::channel::<RecognizeEvent>(256);
        let _ = event_tx.try_send(RecognizeEvent::Listening);
        let idle_timeout = options.idle_timeout;

        let task = tokio::spawn(async move {
            let mut stopping = false;
            let mut deadline = Instant::now() + idle_timeout;

            loop {
                tokio::select! {
                    // Prioritize audio sending for lowest latency
                    biased;

                    command = command_rx.recv(), if !stopping => {
                        match command {
                            Some(Command::Audio(audio)) => {
                                if let Err(e) = ws_sink.send(Message::Binary(audio)).await {
                                    error!(error = %e, "Failed to send audio");
                                    let _ = event_tx.send(RecognizeEvent::Error(format!(
                                        "Failed to send audio: {e}"
                                    ))).await;
                                    break;
                                }
                            }
                            Some(Command::Stop) | None => {
                                stopping = true;
                                let stop = serde_json::to_string(&StopMessage::default())
                                    .unwrap_or_else(|_| r#"{"action":"stop"}"#.to_string());
                                if let Err(e) = ws_sink.send(Message::Text(stop.into())).await {
                                    warn!(error = %e, "Failed to send stop message");
                                    break;
                                }
                                debug!("Sent stop message");
                            }
                        }
                    }

                    message = ws_source.next() => {
                        deadline = Instant::now() + idle_timeout;
                        let event = match message {
                            Some(Ok(Message::Text(text))) => match ServerMessage::parse(&text) {
                                Ok(ServerMessage::Results(results)) => {
                                    Some(RecognizeEvent::Results(results.into()))
                                }
                                Ok(ServerMessage::SpeakerLabels(labels)) => {
                                    Some(RecognizeEvent::SpeakerLabels(labels.speaker_labels))
                                }
                                Ok(ServerMessage::Error(e)) => {
                                    error!(error = %e.error, "Recognition error");
                                    let fatal = e.is_fatal();
                                    let _ = event_tx.send(RecognizeEvent::Error(e.error)).await;
                                    if fatal {
                                        break;
                                    }
                                    None
                                }
                                Ok(message) if message.is_listening() => {
                                    if stopping {
                                        debug!("Recognition of the audio stream finished");
                                        break;
                                    }
                                    None
                                }
                                Ok(ServerMessage::State(state)) => {
                                    debug!(state = %state.state, "State change");
                                    None
                                }
                                Err(e) => {
                                    warn!(error = %e, "Failed to parse message");
                                    None
                                }
                            },
                            Some(Ok(Message::Close(frame))) => {
                                info!(?frame, "WebSocket closed by service");
                                break;
                            }
                            Some(Ok(_)) => None,
                            Some(Err(e)) => {
                                error!(error = %e, "WebSocket error");
                                let _ = event_tx
                                    .send(RecognizeEvent::Error(format!("WebSocket error: {e}")))
                                    .await;
                                break;
                            }
                            None => {
                                info!("WebSocket stream ended");
                                break;
                            }
                        };

                        if let Some(event) = event
                            && event_tx.send(event).await.is_err()
                        {
                            debug!("Event receiver dropped");
                            break;
                        }
                    }

                    _ = sleep_until(deadline) => {
                        error!(timeout_ms = idle_timeout.as_millis() as u64, "WebSocket idle timeout");
                        let _ = event_tx
                            .send(RecognizeEvent::Error(format!(
                                "WebSocket idle timeout - no message for {} ms",
                                idle_timeout.as_millis()
                            )))
                            .await;
                        break;
                    }
                }
            }

            let _ = ws_sink.send(Message::Close(None)).await;
            let _ = event_tx.send(RecognizeEvent::Closed).await;
            info!("Recognition stream closed");
        });

        Ok(RecognizeStream {
            commands: Some(command_tx),
            events: event_rx,
            task: Some(task),
        })
    }
}
