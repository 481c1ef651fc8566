//! Base models and synchronous recognition.

use bytes::Bytes;
use reqwest::Method;
use tracing::warn;

use super::models::{SpeechModel, SpeechModels, SpeechRecognitionResults};
use super::{SpeechToTextV1, op};
use crate::core::error::{WatsonError, WatsonResult};
use crate::core::request::RequestBuilder;
use crate::core::service::DetailedResponse;

/// Smallest audio body accepted for recognition.
pub const MIN_AUDIO_BYTES: usize = 100;

const DEFAULT_AUDIO_CONTENT_TYPE: &str = "application/octet-stream";

// =============================================================================
// Recognition parameters
// =============================================================================

/// Query parameters shared by `recognize` and `create_job`.
///
/// `customization_id` is the deprecated spelling of
/// `language_customization_id`; setting both is rejected.
#[derive(Debug, Clone, Default)]
pub struct RecognitionParams {
    pub model: Option<String>,
    pub language_customization_id: Option<String>,
    pub acoustic_customization_id: Option<String>,
    pub base_model_version: Option<String>,
    /// 0.0 to 1.0
    pub customization_weight: Option<f64>,
    /// Seconds of silence before the connection closes; -1 disables.
    pub inactivity_timeout: Option<i64>,
    pub keywords: Vec<String>,
    /// 0.0 to 1.0; required together with `keywords`.
    pub keywords_threshold: Option<f64>,
    pub max_alternatives: Option<u32>,
    pub word_alternatives_threshold: Option<f64>,
    pub word_confidence: Option<bool>,
    pub timestamps: Option<bool>,
    pub profanity_filter: Option<bool>,
    pub smart_formatting: Option<bool>,
    pub speaker_labels: Option<bool>,
    /// Deprecated spelling of `language_customization_id`.
    pub customization_id: Option<String>,
    pub grammar_name: Option<String>,
    pub redaction: Option<bool>,
    pub audio_metrics: Option<bool>,
    pub end_of_phrase_silence_time: Option<f64>,
    pub split_transcript_at_phrase_end: Option<bool>,
    pub speech_detector_sensitivity: Option<f64>,
    pub background_audio_suppression: Option<f64>,
}

macro_rules! setter {
    ($name:ident, $field:ident, String) => {
        pub fn $name(mut self, value: impl Into<String>) -> Self {
            self.$field = Some(value.into());
            self
        }
    };
    ($name:ident, $field:ident, $ty:ty) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

impl RecognitionParams {
    setter!(with_model, model, String);
    setter!(with_language_customization_id, language_customization_id, String);
    setter!(with_acoustic_customization_id, acoustic_customization_id, String);
    setter!(with_base_model_version, base_model_version, String);
    setter!(with_customization_weight, customization_weight, f64);
    setter!(with_inactivity_timeout, inactivity_timeout, i64);
    setter!(with_keywords_threshold, keywords_threshold, f64);
    setter!(with_max_alternatives, max_alternatives, u32);
    setter!(with_word_alternatives_threshold, word_alternatives_threshold, f64);
    setter!(with_word_confidence, word_confidence, bool);
    setter!(with_timestamps, timestamps, bool);
    setter!(with_profanity_filter, profanity_filter, bool);
    setter!(with_smart_formatting, smart_formatting, bool);
    setter!(with_speaker_labels, speaker_labels, bool);
    setter!(with_grammar_name, grammar_name, String);
    setter!(with_redaction, redaction, bool);
    setter!(with_audio_metrics, audio_metrics, bool);
    setter!(with_end_of_phrase_silence_time, end_of_phrase_silence_time, f64);
    setter!(with_split_transcript_at_phrase_end, split_transcript_at_phrase_end, bool);
    setter!(with_speech_detector_sensitivity, speech_detector_sensitivity, f64);
    setter!(with_background_audio_suppression, background_audio_suppression, f64);

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    #[deprecated(note = "use with_language_customization_id")]
    pub fn with_customization_id(mut self, value: impl Into<String>) -> Self {
        self.customization_id = Some(value.into());
        self
    }

    /// Reject combinations the service would refuse or resolve ambiguously.
    pub fn validate(&self) -> WatsonResult<()> {
        if self.customization_id.is_some() && self.language_customization_id.is_some() {
            return Err(WatsonError::invalid(
                "customization_id",
                "cannot be combined with language_customization_id",
            ));
        }

        for (name, value) in [
            ("customization_weight", self.customization_weight),
            ("keywords_threshold", self.keywords_threshold),
            ("word_alternatives_threshold", self.word_alternatives_threshold),
            ("speech_detector_sensitivity", self.speech_detector_sensitivity),
            ("background_audio_suppression", self.background_audio_suppression),
        ] {
            if let Some(v) = value
                && !(0.0..=1.0).contains(&v)
            {
                return Err(WatsonError::invalid(name, "must be between 0.0 and 1.0"));
            }
        }

        if self.keywords.is_empty() != self.keywords_threshold.is_none() {
            return Err(WatsonError::invalid(
                "keywords",
                "keywords and keywords_threshold must be specified together",
            ));
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(WatsonError::invalid("keywords", "keywords must not be empty"));
        }
        if self.max_alternatives == Some(0) {
            return Err(WatsonError::invalid("max_alternatives", "must be at least 1"));
        }
        if let Some(silence) = self.end_of_phrase_silence_time
            && !(0.0..=120.0).contains(&silence)
        {
            return Err(WatsonError::invalid(
                "end_of_phrase_silence_time",
                "must be between 0.0 and 120.0 seconds",
            ));
        }
        Ok(())
    }

    /// Add every set parameter to the request's query string.
    pub(crate) fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .query_opt("model", self.model.as_deref())
            .query_opt(
                "language_customization_id",
                self.language_customization_id.as_deref(),
            )
            .query_opt(
                "acoustic_customization_id",
                self.acoustic_customization_id.as_deref(),
            )
            .query_opt("base_model_version", self.base_model_version.as_deref())
            .query_opt("customization_weight", self.customization_weight)
            .query_opt("inactivity_timeout", self.inactivity_timeout)
            .query_list("keywords", &self.keywords)
            .query_opt("keywords_threshold", self.keywords_threshold)
            .query_opt("max_alternatives", self.max_alternatives)
            .query_opt(
                "word_alternatives_threshold",
                self.word_alternatives_threshold,
            )
            .query_opt("word_confidence", self.word_confidence)
            .query_opt("timestamps", self.timestamps)
            .query_opt("profanity_filter", self.profanity_filter)
            .query_opt("smart_formatting", self.smart_formatting)
            .query_opt("speaker_labels", self.speaker_labels)
            .query_opt("customization_id", self.customization_id.as_deref())
            .query_opt("grammar_name", self.grammar_name.as_deref())
            .query_opt("redaction", self.redaction)
            .query_opt("audio_metrics", self.audio_metrics)
            .query_opt("end_of_phrase_silence_time", self.end_of_phrase_silence_time)
            .query_opt(
                "split_transcript_at_phrase_end",
                self.split_transcript_at_phrase_end,
            )
            .query_opt(
                "speech_detector_sensitivity",
                self.speech_detector_sensitivity,
            )
            .query_opt(
                "background_audio_suppression",
                self.background_audio_suppression,
            )
    }
}

/// Check that an audio body is present and plausibly sized.
pub(crate) fn validate_audio(audio: &Bytes) -> WatsonResult<()> {
    if audio.is_empty() {
        return Err(WatsonError::missing("audio"));
    }
    if audio.len() < MIN_AUDIO_BYTES {
        return Err(WatsonError::invalid(
            "audio",
            format!(
                "{} bytes is below the minimum of {MIN_AUDIO_BYTES} bytes",
                audio.len()
            ),
        ));
    }
    Ok(())
}

// =============================================================================
// Recognize
// =============================================================================

/// Options for [`SpeechToTextV1::recognize`].
#[derive(Debug, Clone)]
pub struct RecognizeOptions {
    pub audio: Bytes,
    /// `audio/flac`, `audio/wav`, `audio/l16;rate=16000`, ...
    pub content_type: Option<String>,
    pub params: RecognitionParams,
}

impl RecognizeOptions {
    pub fn new(audio: impl Into<Bytes>) -> Self {
        Self {
            audio: audio.into(),
            content_type: None,
            params: RecognitionParams::default(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_params(mut self, params: RecognitionParams) -> Self {
        self.params = params;
        self
    }
}

impl SpeechToTextV1 {
    /// List the base models.
    pub async fn list_models(&self) -> WatsonResult<DetailedResponse<SpeechModels>> {
        let builder = self
            .service
            .request(Method::GET, "/v1/models", &[], op("ListModels"))?;
        self.service.send_json(builder).await
    }

    /// Get one base model.
    pub async fn get_model(&self, model_id: &str) -> WatsonResult<DetailedResponse<SpeechModel>> {
        let builder = self.service.request(
            Method::GET,
            "/v1/models/{model_id}",
            &[("model_id", model_id)],
            op("GetModel"),
        )?;
        self.service.send_json(builder).await
    }

    /// Recognize a complete audio file in one request.
    pub async fn recognize(
        &self,
        options: RecognizeOptions,
    ) -> WatsonResult<DetailedResponse<SpeechRecognitionResults>> {
        validate_audio(&options.audio)?;
        options.params.validate()?;

        let builder = self
            .service
            .request(Method::POST, "/v1/recognize", &[], op("Recognize"))?;
        let builder = options.params.apply(builder).bytes(
            options.audio,
            options
                .content_type
                .unwrap_or_else(|| DEFAULT_AUDIO_CONTENT_TYPE.to_string()),
        );

        let response = self
            .service
            .send_json::<SpeechRecognitionResults>(builder)
            .await?;
        for warning in &response.result.warnings {
            warn!(operation = "Recognize", warning = %warning, "Recognition warning");
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(deprecated)]
    fn test_both_customization_ids_rejected() {
        let params = RecognitionParams::default()
            .with_customization_id("old")
            .with_language_customization_id("new");
        let err = params.validate().unwrap_err();
        assert!(matches!(err, WatsonError::InvalidParameter { ref name, .. } if name == "customization_id"));

        let params = RecognitionParams::default().with_customization_id("old");
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_keywords_require_threshold() {
        let params = RecognitionParams::default().with_keywords(["alpha"]);
        assert!(params.validate().is_err());

        let params = RecognitionParams::default().with_keywords_threshold(0.5);
        assert!(params.validate().is_err());

        let params = RecognitionParams::default()
            .with_keywords(["alpha", "beta"])
            .with_keywords_threshold(0.5);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_ranges_validated() {
        assert!(
            RecognitionParams::default()
                .with_customization_weight(1.5)
                .validate()
                .is_err()
        );
        assert!(
            RecognitionParams::default()
                .with_max_alternatives(0)
                .validate()
                .is_err()
        );
        assert!(
            RecognitionParams::default()
                .with_end_of_phrase_silence_time(0.8)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_validate_audio() {
        assert!(matches!(
            validate_audio(&Bytes::new()),
            Err(WatsonError::MissingParameter(_))
        ));
        assert!(matches!(
            validate_audio(&Bytes::from_static(&[0u8; 99])),
            Err(WatsonError::InvalidParameter { .. })
        ));
        assert!(validate_audio(&Bytes::from(vec![0u8; MIN_AUDIO_BYTES])).is_ok());
    }
}
