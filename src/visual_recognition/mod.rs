//! IBM Watson Visual Recognition V3.
//!
//! Image classification with the built-in classifiers, plus training and
//! management of custom classifiers from zipped example images.

pub mod models;

use std::collections::HashSet;

use bytes::Bytes;
use reqwest::Method;
use reqwest::multipart::Form;
use tracing::info;

use crate::config::ServiceConfig;
use crate::core::error::{WatsonError, WatsonResult};
use crate::core::region::IbmRegion;
use crate::core::request::{RequestBuilder, file_part};
use crate::core::service::{BaseService, DetailedResponse, ServiceOptions};
use crate::core::telemetry::Operation;

pub use models::*;

pub const SERVICE_NAME: &str = "visual_recognition";

pub const SERVICE_VERSION: &str = "V3";

pub const DEFAULT_SERVICE_HOST: &str = "visual-recognition";

const fn op(operation_id: &'static str) -> Operation {
    Operation::new(SERVICE_NAME, SERVICE_VERSION, operation_id)
}

// =============================================================================
// Options
// =============================================================================

/// Images to classify: an image or zip archive upload, and/or an image URL.
#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    pub images_file: Option<Bytes>,
    pub images_filename: Option<String>,
    pub images_file_content_type: Option<String>,
    pub url: Option<String>,
    /// Minimum score (0.0 to 1.0) a class needs to be returned.
    pub threshold: Option<f32>,
    /// `me`, `IBM`, or both.
    pub owners: Vec<String>,
    pub classifier_ids: Vec<String>,
    /// Language of the returned class names.
    pub accept_language: Option<String>,
}

impl ClassifyOptions {
    pub fn from_file(images_file: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        Self {
            images_file: Some(images_file.into()),
            images_filename: Some(filename.into()),
            ..Default::default()
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_images_file_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.images_file_content_type = Some(content_type.into());
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_owners<I, S>(mut self, owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.owners = owners.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_classifier_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classifier_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_accept_language(mut self, language: impl Into<String>) -> Self {
        self.accept_language = Some(language.into());
        self
    }

    fn into_form(self) -> WatsonResult<Form> {
        if self.images_file.is_none() && self.url.is_none() {
            return Err(WatsonError::missing("images_file or url"));
        }
        if let Some(threshold) = self.threshold
            && !(0.0..=1.0).contains(&threshold)
        {
            return Err(WatsonError::invalid("threshold", "must be between 0.0 and 1.0"));
        }

        let mut form = Form::new();
        if let Some(file) = self.images_file {
            if file.is_empty() {
                return Err(WatsonError::missing("images_file"));
            }
            form = form.part(
                "images_file",
                file_part(
                    "images_file",
                    file,
                    self.images_filename.as_deref(),
                    self.images_file_content_type.as_deref(),
                )?,
            );
        }
        if let Some(url) = self.url {
            form = form.text("url", url);
        }
        if let Some(threshold) = self.threshold {
            form = form.text("threshold", threshold.to_string());
        }
        if !self.owners.is_empty() {
            form = form.text("owners", self.owners.join(","));
        }
        if !self.classifier_ids.is_empty() {
            form = form.text("classifier_ids", self.classifier_ids.join(","));
        }
        Ok(form)
    }
}

/// A zip archive of example images for one class.
#[derive(Debug, Clone)]
pub struct ExampleSet {
    pub class: String,
    pub archive: Bytes,
}

impl ExampleSet {
    pub fn new(class: impl Into<String>, archive: impl Into<Bytes>) -> Self {
        Self {
            class: class.into(),
            archive: archive.into(),
        }
    }
}

/// Training data for `create_classifier` and `update_classifier`.
#[derive(Debug, Clone, Default)]
pub struct ClassifierExamples {
    pub positive_examples: Vec<ExampleSet>,
    /// Images that match none of the classes.
    pub negative_examples: Option<Bytes>,
}

impl ClassifierExamples {
    pub fn with_positive(mut self, class: impl Into<String>, archive: impl Into<Bytes>) -> Self {
        self.positive_examples.push(ExampleSet::new(class, archive));
        self
    }

    pub fn with_negative(mut self, archive: impl Into<Bytes>) -> Self {
        self.negative_examples = Some(archive.into());
        self
    }

    fn set_count(&self) -> usize {
        self.positive_examples.len() + usize::from(self.negative_examples.is_some())
    }

    fn validate(&self) -> WatsonResult<()> {
        let mut seen = HashSet::new();
        for set in &self.positive_examples {
            WatsonError::require("class", &set.class)?;
            if set.archive.is_empty() {
                return Err(WatsonError::missing(&format!(
                    "{}_positive_examples",
                    set.class
                )));
            }
            if !seen.insert(set.class.as_str()) {
                return Err(WatsonError::invalid(
                    "positive_examples",
                    format!("class '{}' given more than once", set.class),
                ));
            }
        }
        if self.negative_examples.as_ref().is_some_and(Bytes::is_empty) {
            return Err(WatsonError::missing("negative_examples"));
        }
        Ok(())
    }

    fn append_to(self, mut form: Form) -> WatsonResult<Form> {
        for set in self.positive_examples {
            let field = format!("{}_positive_examples", set.class);
            let filename = format!("{}.zip", set.class);
            let part = file_part(&field, set.archive, Some(&filename), Some("application/zip"))?;
            form = form.part(field, part);
        }
        if let Some(archive) = self.negative_examples {
            let part = file_part(
                "negative_examples",
                archive,
                Some("negative_examples.zip"),
                Some("application/zip"),
            )?;
            form = form.part("negative_examples", part);
        }
        Ok(form)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Visual Recognition V3 client.
#[derive(Debug, Clone)]
pub struct VisualRecognitionV3 {
    service: BaseService,
    version: String,
}

impl VisualRecognitionV3 {
    pub fn default_service_url() -> String {
        IbmRegion::UsSouth.service_url(DEFAULT_SERVICE_HOST)
    }

    /// `version` is the API version date (`YYYY-MM-DD`).
    pub fn new(version: impl Into<String>, options: ServiceOptions) -> WatsonResult<Self> {
        let version = version.into();
        WatsonError::require("version", &version)?;
        Ok(Self {
            service: BaseService::new(options)?,
            version,
        })
    }

    /// Build from `VISUAL_RECOGNITION_*` environment variables and `.env`.
    pub fn from_env(version: impl Into<String>) -> WatsonResult<Self> {
        Self::from_config(version, &ServiceConfig::from_env(SERVICE_NAME)?)
    }

    pub fn from_config(version: impl Into<String>, config: &ServiceConfig) -> WatsonResult<Self> {
        Self::new(version, config.service_options(DEFAULT_SERVICE_HOST)?)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn service(&self) -> &BaseService {
        &self.service
    }

    pub fn set_service_url(&mut self, url: &str) -> WatsonResult<()> {
        self.service.set_service_url(url)
    }

    fn request(
        &self,
        method: Method,
        template: &str,
        path_params: &[(&str, &str)],
        operation_id: &'static str,
    ) -> WatsonResult<RequestBuilder> {
        Ok(self
            .service
            .request(method, template, path_params, op(operation_id))?
            .query("version", &self.version))
    }

    pub async fn classify(
        &self,
        options: ClassifyOptions,
    ) -> WatsonResult<DetailedResponse<ClassifiedImages>> {
        let accept_language = options.accept_language.clone();
        let form = options.into_form()?;
        let builder = self
            .request(Method::POST, "/v3/classify", &[], "Classify")?
            .header_opt("Accept-Language", accept_language.as_deref())?
            .multipart(form);
        self.service.send_json(builder).await
    }

    /// Train a new classifier.
    ///
    /// Needs at least two example sets: two positive classes, or one
    /// positive class and a negative set.
    pub async fn create_classifier(
        &self,
        name: &str,
        examples: ClassifierExamples,
    ) -> WatsonResult<DetailedResponse<Classifier>> {
        WatsonError::require("name", name)?;
        examples.validate()?;
        if examples.positive_examples.is_empty() {
            return Err(WatsonError::missing("positive_examples"));
        }
        if examples.set_count() < 2 {
            return Err(WatsonError::invalid(
                "positive_examples",
                "need two positive classes, or one positive class and negative_examples",
            ));
        }
        let form = examples.append_to(Form::new().text("name", name.to_string()))?;
        let builder = self
            .request(Method::POST, "/v3/classifiers", &[], "CreateClassifier")?
            .multipart(form);
        let response = self.service.send_json::<Classifier>(builder).await?;
        info!(
            classifier_id = %response.result.classifier_id,
            status = ?response.result.status,
            "Classifier created"
        );
        Ok(response)
    }

    pub async fn list_classifiers(
        &self,
        verbose: Option<bool>,
    ) -> WatsonResult<DetailedResponse<Classifiers>> {
        let builder = self
            .request(Method::GET, "/v3/classifiers", &[], "ListClassifiers")?
            .query_opt("verbose", verbose);
        self.service.send_json(builder).await
    }

    pub async fn get_classifier(
        &self,
        classifier_id: &str,
    ) -> WatsonResult<DetailedResponse<Classifier>> {
        let builder = self.request(
            Method::GET,
            "/v3/classifiers/{classifier_id}",
            &[("classifier_id", classifier_id)],
            "GetClassifier",
        )?;
        self.service.send_json(builder).await
    }

    /// Add classes or examples to an existing classifier. Retraining runs
    /// in the background; the classifier reports `retraining` meanwhile.
    pub async fn update_classifier(
        &self,
        classifier_id: &str,
        examples: ClassifierExamples,
    ) -> WatsonResult<DetailedResponse<Classifier>> {
        examples.validate()?;
        if examples.set_count() == 0 {
            return Err(WatsonError::missing("positive_examples or negative_examples"));
        }
        let form = examples.append_to(Form::new())?;
        let builder = self
            .request(
                Method::POST,
                "/v3/classifiers/{classifier_id}",
                &[("classifier_id", classifier_id)],
                "UpdateClassifier",
            )?
            .multipart(form);
        self.service.send_json(builder).await
    }

    pub async fn delete_classifier(&self, classifier_id: &str) -> WatsonResult<DetailedResponse<()>> {
        let builder = self.request(
            Method::DELETE,
            "/v3/classifiers/{classifier_id}",
            &[("classifier_id", classifier_id)],
            "DeleteClassifier",
        )?;
        self.service.send_empty(builder).await
    }

    /// Download the Core ML model of a classifier.
    pub async fn get_core_ml_model(
        &self,
        classifier_id: &str,
    ) -> WatsonResult<DetailedResponse<Bytes>> {
        let builder = self
            .request(
                Method::GET,
                "/v3/classifiers/{classifier_id}/core_ml_model",
                &[("classifier_id", classifier_id)],
                "GetCoreMlModel",
            )?
            .accept(Some("application/octet-stream"));
        self.service.send_bytes(builder).await
    }

    pub async fn delete_user_data(&self, customer_id: &str) -> WatsonResult<DetailedResponse<()>> {
        WatsonError::require("customer_id", customer_id)?;
        let builder = self
            .request(Method::DELETE, "/v3/user_data", &[], "DeleteUserData")?
            .query("customer_id", customer_id);
        self.service.send_empty(builder).await
    }
}
