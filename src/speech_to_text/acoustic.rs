//! Custom acoustic models and their audio resources.

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use tracing::warn;

use super::models::{AcousticModel, AcousticModels, AudioListing, AudioResources, TrainingResponse};
use super::{SpeechToTextV1, op};
use crate::core::error::{WatsonError, WatsonResult};
use crate::core::service::DetailedResponse;

/// Archive formats that may hold several audio files.
const ARCHIVE_CONTENT_TYPES: [&str; 3] = [
    "application/zip",
    "application/gzip",
    "application/x-gzip",
];

#[derive(Debug, Clone, Serialize)]
pub struct CreateAcousticModelOptions {
    pub name: String,
    pub base_model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateAcousticModelOptions {
    pub fn new(name: impl Into<String>, base_model_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_model_name: base_model_name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainAcousticModelOptions {
    /// Custom language model trained alongside for better domain accuracy.
    pub custom_language_model_id: Option<String>,
}

impl TrainAcousticModelOptions {
    pub fn with_custom_language_model_id(mut self, id: impl Into<String>) -> Self {
        self.custom_language_model_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct AddAudioOptions {
    pub audio_name: String,
    pub audio_resource: Bytes,
    /// Audio format, or an archive type (`application/zip`, `application/gzip`).
    pub content_type: String,
    /// Format of the files inside an archive.
    pub contained_content_type: Option<String>,
    pub allow_overwrite: Option<bool>,
}

impl AddAudioOptions {
    pub fn new(
        audio_name: impl Into<String>,
        audio_resource: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            audio_name: audio_name.into(),
            audio_resource: audio_resource.into(),
            content_type: content_type.into(),
            contained_content_type: None,
            allow_overwrite: None,
        }
    }

    pub fn with_contained_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.contained_content_type = Some(content_type.into());
        self
    }

    pub fn with_allow_overwrite(mut self, allow: bool) -> Self {
        self.allow_overwrite = Some(allow);
        self
    }

    fn validate(&self) -> WatsonResult<()> {
        WatsonError::require("audio_name", &self.audio_name)?;
        WatsonError::require("content_type", &self.content_type)?;
        if self.audio_resource.is_empty() {
            return Err(WatsonError::missing("audio_resource"));
        }
        if self.contained_content_type.is_some()
            && !ARCHIVE_CONTENT_TYPES.contains(&self.content_type.as_str())
        {
            return Err(WatsonError::invalid(
                "contained_content_type",
                "only allowed for archive uploads",
            ));
        }
        Ok(())
    }
}

impl SpeechToTextV1 {
    pub async fn create_acoustic_model(
        &self,
        options: CreateAcousticModelOptions,
    ) -> WatsonResult<DetailedResponse<AcousticModel>> {
        WatsonError::require("name", &options.name)?;
        WatsonError::require("base_model_name", &options.base_model_name)?;
        let builder = self
            .service
            .request(
                Method::POST,
                "/v1/acoustic_customizations",
                &[],
                op("CreateAcousticModel"),
            )?
            .json(&options)?;
        self.service.send_json(builder).await
    }

    pub async fn list_acoustic_models(
        &self,
        language: Option<&str>,
    ) -> WatsonResult<DetailedResponse<AcousticModels>> {
        let builder = self
            .service
            .request(
                Method::GET,
                "/v1/acoustic_customizations",
                &[],
                op("ListAcousticModels"),
            )?
            .query_opt("language", language);
        self.service.send_json(builder).await
    }

    pub async fn get_acoustic_model(
        &self,
        customization_id: &str,
    ) -> WatsonResult<DetailedResponse<AcousticModel>> {
        let builder = self.service.request(
            Method::GET,
            "/v1/acoustic_customizations/{customization_id}",
            &[("customization_id", customization_id)],
            op("GetAcousticModel"),
        )?;
        self.service.send_json(builder).await
    }

    pub async fn delete_acoustic_model(
        &self,
        customization_id: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self.service.request(
            Method::DELETE,
            "/v1/acoustic_customizations/{customization_id}",
            &[("customization_id", customization_id)],
            op("DeleteAcousticModel"),
        )?;
        self.service.send_empty(builder).await
    }

    pub async fn train_acoustic_model(
        &self,
        customization_id: &str,
        options: TrainAcousticModelOptions,
    ) -> WatsonResult<DetailedResponse<TrainingResponse>> {
        let builder = self
            .service
            .request(
                Method::POST,
                "/v1/acoustic_customizations/{customization_id}/train",
                &[("customization_id", customization_id)],
                op("TrainAcousticModel"),
            )?
            .query_opt(
                "custom_language_model_id",
                options.custom_language_model_id.as_deref(),
            );
        let response = self.service.send_json::<TrainingResponse>(builder).await?;
        for warning in &response.result.warnings {
            warn!(
                operation = "TrainAcousticModel",
                code = %warning.code,
                message = %warning.message,
                "Training warning"
            );
        }
        Ok(response)
    }

    pub async fn reset_acoustic_model(
        &self,
        customization_id: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self.service.request(
            Method::POST,
            "/v1/acoustic_customizations/{customization_id}/reset",
            &[("customization_id", customization_id)],
            op("ResetAcousticModel"),
        )?;
        self.service.send_empty(builder).await
    }

    pub async fn upgrade_acoustic_model(
        &self,
        customization_id: &str,
        custom_language_model_id: Option<&str>,
        force: Option<bool>,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self
            .service
            .request(
                Method::POST,
                "/v1/acoustic_customizations/{customization_id}/upgrade_model",
                &[("customization_id", customization_id)],
                op("UpgradeAcousticModel"),
            )?
            .query_opt("custom_language_model_id", custom_language_model_id)
            .query_opt("force", force);
        self.service.send_empty(builder).await
    }

    // =========================================================================
    // Audio resources
    // =========================================================================

    pub async fn list_audio(
        &self,
        customization_id: &str,
    ) -> WatsonResult<DetailedResponse<AudioResources>> {
        let builder = self.service.request(
            Method::GET,
            "/v1/acoustic_customizations/{customization_id}/audio",
            &[("customization_id", customization_id)],
            op("ListAudio"),
        )?;
        self.service.send_json(builder).await
    }

    /// Upload an audio file or archive as the raw request body.
    pub async fn add_audio(
        &self,
        customization_id: &str,
        options: AddAudioOptions,
    ) -> WatsonResult<DetailedResponse<()>> {
        options.validate()?;
        let builder = self
            .service
            .request(
                Method::POST,
                "/v1/acoustic_customizations/{customization_id}/audio/{audio_name}",
                &[
                    ("customization_id", customization_id),
                    ("audio_name", options.audio_name.as_str()),
                ],
                op("AddAudio"),
            )?
            .header_opt(
                "Contained-Content-Type",
                options.contained_content_type.as_deref(),
            )?
            .query_opt("allow_overwrite", options.allow_overwrite)
            .bytes(options.audio_resource, options.content_type);
        self.service.send_empty(builder).await
    }

    pub async fn get_audio(
        &self,
        customization_id: &str,
        audio_name: &str,
    ) -> WatsonResult<DetailedResponse<AudioListing>> {
        let builder = self.service.request(
            Method::GET,
            "/v1/acoustic_customizations/{customization_id}/audio/{audio_name}",
            &[
                ("customization_id", customization_id),
                ("audio_name", audio_name),
            ],
            op("GetAudio"),
        )?;
        self.service.send_json(builder).await
    }

    pub async fn delete_audio(
        &self,
        customization_id: &str,
        audio_name: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self.service.request(
            Method::DELETE,
            "/v1/acoustic_customizations/{customization_id}/audio/{audio_name}",
            &[
                ("customization_id", customization_id),
                ("audio_name", audio_name),
            ],
            op("DeleteAudio"),
        )?;
        self.service.send_empty(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contained_content_type_only_for_archives() {
        let options = AddAudioOptions::new("a1", vec![0u8; 10], "audio/wav")
            .with_contained_content_type("audio/wav");
        assert!(options.validate().is_err());

        let options = AddAudioOptions::new("a1", vec![0u8; 10], "application/zip")
            .with_contained_content_type("audio/l16;rate=16000");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_add_audio_requires_body() {
        let options = AddAudioOptions::new("a1", Vec::new(), "audio/wav");
        assert!(matches!(
            options.validate(),
            Err(WatsonError::MissingParameter(_))
        ));
    }
}
