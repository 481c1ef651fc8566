//! Speech to Text V1 data model.
//!
//! Response types decode leniently: collections default to empty and status
//! enums carry an `Unknown` variant so newer server states never break
//! decoding.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Models
// =============================================================================

/// Base models offered by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeechModels {
    #[serde(default)]
    pub models: Vec<SpeechModel>,
}

/// A base (pretrained) model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechModel {
    pub name: String,
    pub language: String,
    /// Sampling rate in Hz.
    pub rate: u32,
    pub url: String,
    #[serde(default)]
    pub supported_features: SupportedFeatures,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportedFeatures {
    #[serde(default)]
    pub custom_language_model: bool,
    #[serde(default)]
    pub custom_acoustic_model: bool,
    #[serde(default)]
    pub speaker_labels: bool,
    #[serde(default)]
    pub low_latency: Option<bool>,
}

// =============================================================================
// Recognition Results
// =============================================================================

/// Results of one recognition request or one completed job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeechRecognitionResults {
    #[serde(default)]
    pub results: Vec<SpeechRecognitionResult>,
    #[serde(default)]
    pub result_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub speaker_labels: Vec<SpeakerLabelsResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_metrics: Option<ProcessingMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_metrics: Option<AudioMetrics>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl SpeechRecognitionResults {
    /// Best transcript of every final result, joined with spaces.
    pub fn transcript(&self) -> String {
        self.results
            .iter()
            .filter(|r| r.is_final)
            .filter_map(|r| r.alternatives.first())
            .map(|alt| alt.transcript.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A single (interim or final) result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechRecognitionResult {
    /// Final results are no longer updated.
    #[serde(rename = "final")]
    pub is_final: bool,
    #[serde(default)]
    pub alternatives: Vec<SpeechRecognitionAlternative>,
    /// Spotted keywords, keyed by the requested keyword.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords_result: Option<HashMap<String, Vec<KeywordResult>>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub word_alternatives: Vec<WordAlternativeResults>,
    /// `end_of_data`, `full_stop`, `reset` or `silence`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_of_utterance: Option<String>,
}

/// Transcription hypothesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechRecognitionAlternative {
    pub transcript: String,
    /// Only present for final results.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Word-level timestamps: [[word, start_time, end_time], ...]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timestamps: Vec<WordTimestamp>,
    /// Word-level confidence scores: [[word, confidence], ...]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub word_confidence: Vec<WordConfidence>,
}

/// Word-level timestamp [word, start_time, end_time].
pub type WordTimestamp = (String, f64, f64);

/// Word-level confidence [word, confidence].
pub type WordConfidence = (String, f64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordResult {
    pub normalized_text: String,
    pub start_time: f64,
    pub end_time: f64,
    pub confidence: f64,
}

/// Word alternatives (confusion network entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordAlternativeResults {
    pub start_time: f64,
    pub end_time: f64,
    pub alternatives: Vec<WordAlternativeResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordAlternativeResult {
    pub confidence: f64,
    pub word: String,
}

/// Speaker diarization entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerLabelsResult {
    pub from: f64,
    pub to: f64,
    pub speaker: i64,
    pub confidence: f64,
    #[serde(rename = "final")]
    pub is_final: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingMetrics {
    pub processed_audio: ProcessedAudio,
    pub wall_clock_since_first_byte_received: f64,
    pub periodic: bool,
}

/// Seconds of audio that reached each processing stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessedAudio {
    pub received: f64,
    pub seen_by_engine: f64,
    pub transcription: f64,
    pub speaker_labels: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioMetrics {
    pub sampling_interval: f64,
    pub accumulated: AudioMetricsDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioMetricsDetails {
    #[serde(rename = "final")]
    pub is_final: bool,
    pub end_time: f64,
    pub signal_to_noise_ratio: Option<f64>,
    pub speech_ratio: f64,
    pub high_frequency_loss: f64,
    pub direct_current_offset: Vec<AudioMetricsHistogramBin>,
    pub clipping_rate: Vec<AudioMetricsHistogramBin>,
    pub speech_level: Vec<AudioMetricsHistogramBin>,
    pub non_speech_level: Vec<AudioMetricsHistogramBin>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioMetricsHistogramBin {
    pub begin: f64,
    pub end: f64,
    pub count: i64,
}

// =============================================================================
// Asynchronous Jobs
// =============================================================================

/// Job lifecycle: `waiting → processing → {completed, failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Waiting,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    /// `completed` and `failed` are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the service may move a job from `self` directly to `next`.
    /// Staying in the same state is always allowed.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::Waiting, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Position in the lifecycle; polling may skip states but never goes back.
    pub(crate) fn rank(&self) -> Option<u8> {
        match self {
            Self::Waiting => Some(0),
            Self::Processing => Some(1),
            Self::Completed | Self::Failed => Some(2),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asynchronous recognition job as reported by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionJob {
    pub id: String,
    pub status: JobStatus,
    pub created: String,
    #[serde(default)]
    pub updated: Option<String>,
    /// Status URL; only returned by `create_job`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user_token: Option<String>,
    /// One entry per recognition; only present once the job completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<SpeechRecognitionResults>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

/// Typed view of a job that only exposes what its status allows.
#[derive(Debug, Clone, Copy)]
pub enum JobOutcome<'a> {
    /// `waiting` or `processing`.
    Pending(JobStatus),
    Completed(&'a [SpeechRecognitionResults]),
    /// Failure details reported by the service, possibly empty.
    Failed(&'a [String]),
    /// The payload contradicts its status.
    Inconsistent(&'static str),
    /// A status this client does not know.
    Unknown,
}

impl RecognitionJob {
    pub fn outcome(&self) -> JobOutcome<'_> {
        match self.status {
            JobStatus::Waiting | JobStatus::Processing => match self.results {
                Some(_) => JobOutcome::Inconsistent("results present on an unfinished job"),
                None => JobOutcome::Pending(self.status),
            },
            JobStatus::Completed => match self.results.as_deref() {
                Some(results) if !results.is_empty() => JobOutcome::Completed(results),
                _ => JobOutcome::Inconsistent("completed job carries no results"),
            },
            JobStatus::Failed => match self.results {
                Some(_) => JobOutcome::Inconsistent("results present on a failed job"),
                None => JobOutcome::Failed(self.warnings.as_deref().unwrap_or_default()),
            },
            JobStatus::Unknown => JobOutcome::Unknown,
        }
    }

    /// Results, only when the job completed.
    pub fn results(&self) -> Option<&[SpeechRecognitionResults]> {
        match self.outcome() {
            JobOutcome::Completed(results) => Some(results),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecognitionJobs {
    #[serde(default)]
    pub recognitions: Vec<RecognitionJob>,
}

/// Callback events a job can notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobEvent {
    #[serde(rename = "recognitions.started")]
    Started,
    #[serde(rename = "recognitions.completed")]
    Completed,
    #[serde(rename = "recognitions.completed_with_results")]
    CompletedWithResults,
    #[serde(rename = "recognitions.failed")]
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "recognitions.started",
            Self::Completed => "recognitions.completed",
            Self::CompletedWithResults => "recognitions.completed_with_results",
            Self::Failed => "recognitions.failed",
            Self::Unknown => "unknown",
        }
    }
}

// =============================================================================
// Callback Registration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationState {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "already created")]
    AlreadyCreated,
    #[serde(other)]
    Unknown,
}

/// Outcome of `register_callback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterStatus {
    pub status: RegistrationState,
    pub url: String,
}

// =============================================================================
// Custom Language Models
// =============================================================================

/// Status shared by custom language and acoustic models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Pending,
    Ready,
    Training,
    Available,
    Upgrading,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageModel {
    pub customization_id: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub dialect: Option<String>,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub base_model_name: Option<String>,
    #[serde(default = "unknown_status")]
    pub status: ModelStatus,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Option<String>,
}

fn unknown_status() -> ModelStatus {
    ModelStatus::Unknown
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageModels {
    #[serde(default)]
    pub customizations: Vec<LanguageModel>,
}

/// Warnings returned by an otherwise successful training request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingResponse {
    #[serde(default)]
    pub warnings: Vec<TrainingWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingWarning {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusStatus {
    Analyzed,
    BeingProcessed,
    Undetermined,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corpus {
    pub name: String,
    #[serde(default)]
    pub total_words: i64,
    #[serde(default)]
    pub out_of_vocabulary_words: i64,
    pub status: CorpusStatus,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpora {
    #[serde(default)]
    pub corpora: Vec<Corpus>,
}

/// A word to add to a custom language model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomWord {
    /// Required by `add_words`; omitted by `add_word`, which takes it from the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sounds_like: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_as: Option<String>,
}

impl CustomWord {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: Some(word.into()),
            ..Default::default()
        }
    }

    pub fn with_sounds_like<I, S>(mut self, sounds_like: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sounds_like = sounds_like.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_display_as(mut self, display_as: impl Into<String>) -> Self {
        self.display_as = Some(display_as.into());
        self
    }
}

/// A word in a custom language model's vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub word: String,
    #[serde(default)]
    pub sounds_like: Vec<String>,
    #[serde(default)]
    pub display_as: String,
    #[serde(default)]
    pub count: i64,
    /// `user`, or the corpora and grammars the word came from.
    #[serde(default)]
    pub source: Vec<String>,
    /// Problems with individual `sounds_like` entries, keyed by element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Vec<HashMap<String, String>>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Words {
    #[serde(default)]
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grammar {
    pub name: String,
    #[serde(default)]
    pub out_of_vocabulary_words: i64,
    pub status: CorpusStatus,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Grammars {
    #[serde(default)]
    pub grammars: Vec<Grammar>,
}

// =============================================================================
// Custom Acoustic Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcousticModel {
    pub customization_id: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub base_model_name: Option<String>,
    #[serde(default = "unknown_status")]
    pub status: ModelStatus,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub warnings: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcousticModels {
    #[serde(default)]
    pub customizations: Vec<AcousticModel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioStatus {
    Ok,
    BeingProcessed,
    Invalid,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioDetails {
    /// `audio`, `archive` or `undetermined`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub frequency: Option<i64>,
    /// `zip` or `gzip` for archives.
    #[serde(default)]
    pub compression: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioResource {
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
    pub name: String,
    #[serde(default)]
    pub details: AudioDetails,
    pub status: AudioStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioResources {
    #[serde(default)]
    pub total_minutes_of_audio: f64,
    #[serde(default)]
    pub audio: Vec<AudioResource>,
}

/// A single audio file or an archive with its contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioListing {
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub details: Option<AudioDetails>,
    #[serde(default)]
    pub status: Option<AudioStatus>,
    /// Set for archives.
    #[serde(default)]
    pub container: Option<AudioResource>,
    #[serde(default)]
    pub audio: Vec<AudioResource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(json: &str) -> RecognitionJob {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_job_status_transitions() {
        use JobStatus::*;
        assert!(Waiting.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Completed.can_transition_to(Completed));

        assert!(!Waiting.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Processing.can_transition_to(Waiting));

        assert!(Completed.is_terminal() && Failed.is_terminal());
        assert!(!Waiting.is_terminal() && !Processing.is_terminal());
    }

    #[test]
    fn test_unknown_status_decodes() {
        let job = job(r#"{"id": "j1", "status": "paused", "created": "2024-01-01T00:00:00Z"}"#);
        assert_eq!(job.status, JobStatus::Unknown);
        assert!(matches!(job.outcome(), JobOutcome::Unknown));
    }

    #[test]
    fn test_completed_job_outcome() {
        let job = job(
            r#"{
                "id": "j1",
                "status": "completed",
                "created": "2024-01-01T00:00:00Z",
                "updated": "2024-01-01T00:01:00Z",
                "results": [{
                    "results": [{
                        "final": true,
                        "alternatives": [{
                            "transcript": "hello world ",
                            "confidence": 0.9,
                            "timestamps": [["hello", 0.0, 0.4], ["world", 0.5, 0.9]]
                        }]
                    }],
                    "result_index": 0
                }]
            }"#,
        );
        let results = job.results().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].transcript(), "hello world");
        assert_eq!(results[0].results[0].alternatives[0].timestamps[1].0, "world");
    }

    #[test]
    fn test_pending_and_failed_outcomes() {
        let waiting = job(r#"{"id": "j1", "status": "waiting", "created": "c"}"#);
        assert!(matches!(
            waiting.outcome(),
            JobOutcome::Pending(JobStatus::Waiting)
        ));
        assert!(waiting.results().is_none());

        let failed = job(
            r#"{"id": "j1", "status": "failed", "created": "c", "warnings": ["bad audio"]}"#,
        );
        match failed.outcome() {
            JobOutcome::Failed(warnings) => assert_eq!(warnings, ["bad audio".to_string()]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_inconsistent_outcomes() {
        let completed_empty = job(r#"{"id": "j1", "status": "completed", "created": "c"}"#);
        assert!(matches!(completed_empty.outcome(), JobOutcome::Inconsistent(_)));

        let processing_with_results = job(
            r#"{"id": "j1", "status": "processing", "created": "c", "results": [{"results": []}]}"#,
        );
        assert!(matches!(
            processing_with_results.outcome(),
            JobOutcome::Inconsistent(_)
        ));
        assert!(processing_with_results.results().is_none());
    }

    #[test]
    fn test_register_status_decodes() {
        let status: RegisterStatus =
            serde_json::from_str(r#"{"status": "already created", "url": "https://cb"}"#).unwrap();
        assert_eq!(status.status, RegistrationState::AlreadyCreated);
    }

    #[test]
    fn test_custom_word_serialization() {
        let word = CustomWord::new("IEEE")
            .with_sounds_like(["I triple E"])
            .with_display_as("IEEE");
        let json = serde_json::to_value(&word).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"word": "IEEE", "sounds_like": ["I triple E"], "display_as": "IEEE"})
        );

        let bare = serde_json::to_value(CustomWord::default()).unwrap();
        assert_eq!(bare, serde_json::json!({}));
    }

    #[test]
    fn test_job_event_names() {
        let event: JobEvent = serde_json::from_str("\"recognitions.completed_with_results\"").unwrap();
        assert_eq!(event, JobEvent::CompletedWithResults);
        assert_eq!(JobEvent::Started.as_str(), "recognitions.started");
    }
}
