//! Document ingestion and relevancy training data.

use bytes::Bytes;
use reqwest::Method;
use reqwest::multipart::Form;
use serde_json::Value;
use tracing::warn;

use super::DiscoveryV1;
use super::models::{
    DeleteDocumentResponse, DocumentAccepted, DocumentStatus, TrainingDataSet, TrainingQuery,
};
use crate::core::error::{WatsonError, WatsonResult};
use crate::core::request::file_part;
use crate::core::service::DetailedResponse;

/// Content and metadata for `add_document` / `update_document`.
///
/// At least one of `file` or `metadata` must be present.
#[derive(Debug, Clone, Default)]
pub struct DocumentOptions {
    pub file: Option<Bytes>,
    pub filename: Option<String>,
    /// `application/json`, `application/pdf`, `text/html`, ...
    pub file_content_type: Option<String>,
    pub metadata: Option<Value>,
}

impl DocumentOptions {
    pub fn with_file(mut self, file: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self.filename = Some(filename.into());
        self
    }

    pub fn with_file_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.file_content_type = Some(content_type.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn into_form(self) -> WatsonResult<Form> {
        if self.file.is_none() && self.metadata.is_none() {
            return Err(WatsonError::missing("file or metadata"));
        }
        if let Some(metadata) = &self.metadata
            && !metadata.is_object()
        {
            return Err(WatsonError::invalid("metadata", "must be a JSON object"));
        }

        let mut form = Form::new();
        if let Some(file) = self.file {
            if file.is_empty() {
                return Err(WatsonError::missing("file"));
            }
            form = form.part(
                "file",
                file_part(
                    "file",
                    file,
                    self.filename.as_deref(),
                    self.file_content_type.as_deref(),
                )?,
            );
        }
        if let Some(metadata) = self.metadata {
            form = form.text("metadata", metadata.to_string());
        }
        Ok(form)
    }
}

impl DiscoveryV1 {
    /// Ingest a document. Processing is asynchronous; poll `get_document_status`.
    pub async fn add_document(
        &self,
        environment_id: &str,
        collection_id: &str,
        options: DocumentOptions,
    ) -> WatsonResult<DetailedResponse<DocumentAccepted>> {
        let form = options.into_form()?;
        let builder = self
            .request(
                Method::POST,
                "/v1/environments/{environment_id}/collections/{collection_id}/documents",
                &[
                    ("environment_id", environment_id),
                    ("collection_id", collection_id),
                ],
                "AddDocument",
            )?
            .multipart(form);
        let response = self.service.send_json::<DocumentAccepted>(builder).await?;
        log_notices("AddDocument", &response.result);
        Ok(response)
    }

    pub async fn get_document_status(
        &self,
        environment_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> WatsonResult<DetailedResponse<DocumentStatus>> {
        let builder = self.request(
            Method::GET,
            "/v1/environments/{environment_id}/collections/{collection_id}/documents/{document_id}",
            &[
                ("environment_id", environment_id),
                ("collection_id", collection_id),
                ("document_id", document_id),
            ],
            "GetDocumentStatus",
        )?;
        self.service.send_json(builder).await
    }

    /// Replace a document, or create it under `document_id`.
    pub async fn update_document(
        &self,
        environment_id: &str,
        collection_id: &str,
        document_id: &str,
        options: DocumentOptions,
    ) -> WatsonResult<DetailedResponse<DocumentAccepted>> {
        let form = options.into_form()?;
        let builder = self
            .request(
                Method::POST,
                "/v1/environments/{environment_id}/collections/{collection_id}/documents/{document_id}",
                &[
                    ("environment_id", environment_id),
                    ("collection_id", collection_id),
                    ("document_id", document_id),
                ],
                "UpdateDocument",
            )?
            .multipart(form);
        let response = self.service.send_json::<DocumentAccepted>(builder).await?;
        log_notices("UpdateDocument", &response.result);
        Ok(response)
    }

    pub async fn delete_document(
        &self,
        environment_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> WatsonResult<DetailedResponse<DeleteDocumentResponse>> {
        let builder = self.request(
            Method::DELETE,
            "/v1/environments/{environment_id}/collections/{collection_id}/documents/{document_id}",
            &[
                ("environment_id", environment_id),
                ("collection_id", collection_id),
                ("document_id", document_id),
            ],
            "DeleteDocument",
        )?;
        self.service.send_json(builder).await
    }

    // =========================================================================
    // Training data
    // =========================================================================

    pub async fn list_training_data(
        &self,
        environment_id: &str,
        collection_id: &str,
    ) -> WatsonResult<DetailedResponse<TrainingDataSet>> {
        let builder = self.request(
            Method::GET,
            "/v1/environments/{environment_id}/collections/{collection_id}/training_data",
            &[
                ("environment_id", environment_id),
                ("collection_id", collection_id),
            ],
            "ListTrainingData",
        )?;
        self.service.send_json(builder).await
    }

    pub async fn add_training_data(
        &self,
        environment_id: &str,
        collection_id: &str,
        query: &TrainingQuery,
    ) -> WatsonResult<DetailedResponse<TrainingQuery>> {
        WatsonError::require(
            "natural_language_query",
            query.natural_language_query.as_deref().unwrap_or_default(),
        )?;
        if query.examples.iter().any(|e| e.document_id.trim().is_empty()) {
            return Err(WatsonError::missing("examples.document_id"));
        }
        let builder = self
            .request(
                Method::POST,
                "/v1/environments/{environment_id}/collections/{collection_id}/training_data",
                &[
                    ("environment_id", environment_id),
                    ("collection_id", collection_id),
                ],
                "AddTrainingData",
            )?
            .json(query)?;
        self.service.send_json(builder).await
    }

    pub async fn get_training_data(
        &self,
        environment_id: &str,
        collection_id: &str,
        query_id: &str,
    ) -> WatsonResult<DetailedResponse<TrainingQuery>> {
        let builder = self.request(
            Method::GET,
            "/v1/environments/{environment_id}/collections/{collection_id}/training_data/{query_id}",
            &[
                ("environment_id", environment_id),
                ("collection_id", collection_id),
                ("query_id", query_id),
            ],
            "GetTrainingData",
        )?;
        self.service.send_json(builder).await
    }

    pub async fn delete_training_data(
        &self,
        environment_id: &str,
        collection_id: &str,
        query_id: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self
            .request(
                Method::DELETE,
                "/v1/environments/{environment_id}/collections/{collection_id}/training_data/{query_id}",
                &[
                    ("environment_id", environment_id),
                    ("collection_id", collection_id),
                    ("query_id", query_id),
                ],
                "DeleteTrainingData",
            )?;
        self.service.send_empty(builder).await
    }

    /// Remove every training query from the collection.
    pub async fn delete_all_training_data(
        &self,
        environment_id: &str,
        collection_id: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self
            .request(
                Method::DELETE,
                "/v1/environments/{environment_id}/collections/{collection_id}/training_data",
                &[
                    ("environment_id", environment_id),
                    ("collection_id", collection_id),
                ],
                "DeleteAllTrainingData",
            )?;
        self.service.send_empty(builder).await
    }
}

fn log_notices(operation: &'static str, accepted: &DocumentAccepted) {
    for notice in &accepted.notices {
        warn!(
            operation,
            document_id = accepted.document_id.as_deref().unwrap_or("-"),
            severity = notice.severity.as_deref().unwrap_or("-"),
            description = notice.description.as_deref().unwrap_or(""),
            "Ingestion notice"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_requires_file_or_metadata() {
        let result = DocumentOptions::default().into_form();
        assert!(matches!(result, Err(WatsonError::MissingParameter(_))));
    }

    #[test]
    fn test_metadata_only_document() {
        let options = DocumentOptions::default().with_metadata(serde_json::json!({"source": "wiki"}));
        assert!(options.into_form().is_ok());
    }

    #[test]
    fn test_metadata_must_be_object() {
        let options = DocumentOptions::default().with_metadata(serde_json::json!(["a"]));
        assert!(matches!(
            options.into_form(),
            Err(WatsonError::InvalidParameter { .. })
        ));
    }
}
