//! WebSocket recognition message types.
//!
//! Text frames exchanged on `/v1/recognize`: the client opens with a `start`
//! action and ends the audio with `stop`; the service answers with state,
//! results, speaker label and error messages.

use serde::{Deserialize, Serialize};

use super::models::{SpeakerLabelsResult, SpeechRecognitionResult, SpeechRecognitionResults};
use super::recognize::RecognitionParams;

// =============================================================================
// Server Messages
// =============================================================================

/// Message received from the service.
///
/// - `results`: Recognition results (interim or final)
/// - `speaker_labels`: Speaker diarization results
/// - `error`: Error notification
/// - `state`: `listening` once ready for audio, and again after each `stop`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Results(ResultsMessage),
    SpeakerLabels(SpeakerLabelsMessage),
    Error(ErrorMessage),
    State(StateMessage),
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn is_listening(&self) -> bool {
        matches!(self, Self::State(state) if state.state == "listening")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsMessage {
    pub results: Vec<SpeechRecognitionResult>,
    #[serde(default)]
    pub result_index: i64,
    /// Present when speaker labels arrive together with results.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub speaker_labels: Vec<SpeakerLabelsResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<ResultsMessage> for SpeechRecognitionResults {
    fn from(message: ResultsMessage) -> Self {
        Self {
            results: message.results,
            result_index: Some(message.result_index),
            speaker_labels: message.speaker_labels,
            warnings: message.warnings,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerLabelsMessage {
    pub speaker_labels: Vec<SpeakerLabelsResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateMessage {
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error: String,
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

impl ErrorMessage {
    /// Inactivity and session timeouts end the recognition.
    pub fn is_fatal(&self) -> bool {
        self.error.contains("timed out")
            || self.error.contains("inactivity")
            || self.error.contains("session closed")
            || self.code.is_some_and(|c| c == 408 || c >= 500)
    }
}

// =============================================================================
// Client Messages
// =============================================================================

/// Opens a recognition request.
#[derive(Debug, Clone, Serialize)]
pub struct StartMessage {
    pub action: &'static str,
    #[serde(rename = "content-type")]
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interim_results: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customization_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactivity_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_alternatives: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_alternatives_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_confidence: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profanity_filter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_formatting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_labels: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammar_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redaction: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_metrics: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_metrics: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_of_phrase_silence_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_transcript_at_phrase_end: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_detector_sensitivity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_audio_suppression: Option<f64>,
}

impl StartMessage {
    /// Everything except the model and customization ids, which travel in
    /// the connection URL.
    pub fn new(
        content_type: impl Into<String>,
        params: &RecognitionParams,
        interim_results: Option<bool>,
        processing_metrics: Option<bool>,
    ) -> Self {
        Self {
            action: "start",
            content_type: content_type.into(),
            interim_results,
            customization_weight: params.customization_weight,
            inactivity_timeout: params.inactivity_timeout,
            keywords: params.keywords.clone(),
            keywords_threshold: params.keywords_threshold,
            max_alternatives: params.max_alternatives,
            word_alternatives_threshold: params.word_alternatives_threshold,
            word_confidence: params.word_confidence,
            timestamps: params.timestamps,
            profanity_filter: params.profanity_filter,
            smart_formatting: params.smart_formatting,
            speaker_labels: params.speaker_labels,
            grammar_name: params.grammar_name.clone(),
            redaction: params.redaction,
            processing_metrics,
            audio_metrics: params.audio_metrics,
            end_of_phrase_silence_time: params.end_of_phrase_silence_time,
            split_transcript_at_phrase_end: params.split_transcript_at_phrase_end,
            speech_detector_sensitivity: params.speech_detector_sensitivity,
            background_audio_suppression: params.background_audio_suppression,
        }
    }
}

/// Signals the end of the audio.
#[derive(Debug, Clone, Serialize)]
pub struct StopMessage {
    pub action: &'static str,
}

impl Default for StopMessage {
    fn default() -> Self {
        Self { action: "stop" }
    }
}
