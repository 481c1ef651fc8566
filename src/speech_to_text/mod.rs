//! IBM Watson Speech to Text V1.
//!
//! # Features
//!
//! - Synchronous recognition of a complete audio file (`recognize`)
//! - Asynchronous recognition jobs with callback registration and polling
//! - Callback signature verification and an axum router for the callback endpoint
//! - Custom language models (corpora, words, grammars)
//! - Custom acoustic models (audio resources)
//! - Streaming recognition over WebSocket
//!
//! # Example
//!
//! ```rust,no_run
//! use watson_sdk::core::{IamAuthenticator, ServiceOptions, shared};
//! use watson_sdk::speech_to_text::{CreateJobOptions, PollOptions, SpeechToTextV1};
//!
//! # async fn run(audio: bytes::Bytes) -> Result<(), watson_sdk::WatsonError> {
//! let stt = SpeechToTextV1::new(ServiceOptions::new(
//!     SpeechToTextV1::default_service_url(),
//!     shared(IamAuthenticator::new("your-api-key")?),
//! ))?;
//!
//! let job = stt
//!     .create_job(CreateJobOptions::new(audio).with_content_type("audio/flac"))
//!     .await?
//!     .into_result();
//!
//! let finished = stt.wait_for_job(&job.id, PollOptions::default()).await?;
//! if let Some(results) = finished.results() {
//!     println!("{}", results[0].transcript());
//! }
//! # Ok(())
//! # }
//! ```

mod acoustic;
mod callback;
mod customization;
mod jobs;
pub mod messages;
pub mod models;
mod recognize;
mod stream;

use reqwest::Method;

use crate::config::ServiceConfig;
use crate::core::error::{WatsonError, WatsonResult};
use crate::core::region::IbmRegion;
use crate::core::service::{BaseService, DetailedResponse, ServiceOptions};
use crate::core::telemetry::Operation;

pub use acoustic::{AddAudioOptions, CreateAcousticModelOptions, TrainAcousticModelOptions};
pub use callback::{
    CALLBACK_SIGNATURE_HEADER, CHALLENGE_PARAM, CallbackVerifier, JobNotification,
};
#[cfg(feature = "callback-server")]
pub use callback::callback_router;
pub use customization::{
    AddCorpusOptions, AddGrammarOptions, CreateLanguageModelOptions, ListWordsOptions,
    TrainLanguageModelOptions, WordSort, WordType, WordTypeToAdd,
};
pub use jobs::{CreateJobOptions, PollOptions, RegisterCallbackOptions};
pub use models::*;
pub use recognize::{MIN_AUDIO_BYTES, RecognitionParams, RecognizeOptions};
pub use stream::{RecognizeEvent, RecognizeStream, RecognizeStreamOptions};

/// Service name used in telemetry and configuration lookups.
pub const SERVICE_NAME: &str = "speech_to_text";

/// API version reported in telemetry.
pub const SERVICE_VERSION: &str = "V1";

/// Host component of the default regional endpoint.
pub const DEFAULT_SERVICE_HOST: &str = "speech-to-text";

const fn op(operation_id: &'static str) -> Operation {
    Operation::new(SERVICE_NAME, SERVICE_VERSION, operation_id)
}

/// Speech to Text V1 client.
#[derive(Debug, Clone)]
pub struct SpeechToTextV1 {
    service: BaseService,
}

impl SpeechToTextV1 {
    /// `https://api.us-south.speech-to-text.watson.cloud.ibm.com`
    pub fn default_service_url() -> String {
        IbmRegion::UsSouth.service_url(DEFAULT_SERVICE_HOST)
    }

    pub fn new(options: ServiceOptions) -> WatsonResult<Self> {
        Ok(Self {
            service: BaseService::new(options)?,
        })
    }

    /// Build from `SPEECH_TO_TEXT_*` environment variables and `.env`.
    pub fn from_env() -> WatsonResult<Self> {
        Self::from_config(&ServiceConfig::from_env(SERVICE_NAME)?)
    }

    pub fn from_config(config: &ServiceConfig) -> WatsonResult<Self> {
        Self::new(config.service_options(DEFAULT_SERVICE_HOST)?)
    }

    /// Underlying HTTP plumbing.
    pub fn service(&self) -> &BaseService {
        &self.service
    }

    pub fn set_service_url(&mut self, url: &str) -> WatsonResult<()> {
        self.service.set_service_url(url)
    }

    /// Delete all data associated with a customer id.
    ///
    /// `DELETE /v1/user_data?customer_id=...`
    pub async fn delete_user_data(&self, customer_id: &str) -> WatsonResult<DetailedResponse<()>> {
        WatsonError::require("customer_id", customer_id)?;
        let builder = self
            .service
            .request(Method::DELETE, "/v1/user_data", &[], op("DeleteUserData"))?
            .query("customer_id", customer_id);
        self.service.send_empty(builder).await
    }
}
