//! IBM Watson Discovery V1.
//!
//! Environments hold configurations and collections; collections hold the
//! ingested documents, query expansions and relevancy training data.
//! Every request carries the `version` date given at construction.
//!
//! # Example
//!
//! ```rust,no_run
//! use watson_sdk::core::{IamAuthenticator, ServiceOptions, shared};
//! use watson_sdk::discovery::{DiscoveryV1, QueryOptions};
//!
//! # async fn run() -> Result<(), watson_sdk::WatsonError> {
//! let discovery = DiscoveryV1::new(
//!     "2019-04-30",
//!     ServiceOptions::new(
//!         DiscoveryV1::default_service_url(),
//!         shared(IamAuthenticator::new("your-api-key")?),
//!     ),
//! )?;
//!
//! let response = discovery
//!     .query(
//!         "env-id",
//!         "collection-id",
//!         QueryOptions::default().with_natural_language_query("release notes"),
//!     )
//!     .await?
//!     .into_result();
//! println!("{} matching documents", response.matching_results);
//! # Ok(())
//! # }
//! ```

mod documents;
pub mod models;
mod queries;

use reqwest::Method;

use crate::config::ServiceConfig;
use crate::core::error::{WatsonError, WatsonResult};
use crate::core::region::IbmRegion;
use crate::core::request::RequestBuilder;
use crate::core::service::{BaseService, DetailedResponse, ServiceOptions};
use crate::core::telemetry::Operation;

pub use documents::DocumentOptions;
pub use models::*;
pub use queries::{AutocompletionOptions, FederatedQueryOptions, QueryOptions};

pub const SERVICE_NAME: &str = "discovery";

pub const SERVICE_VERSION: &str = "V1";

pub const DEFAULT_SERVICE_HOST: &str = "discovery";

const fn op(operation_id: &'static str) -> Operation {
    Operation::new(SERVICE_NAME, SERVICE_VERSION, operation_id)
}

/// Discovery V1 client.
#[derive(Debug, Clone)]
pub struct DiscoveryV1 {
    service: BaseService,
    version: String,
}

impl DiscoveryV1 {
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

    /// Build from `DISCOVERY_*` environment variables and `.env`.
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

    // =========================================================================
    // Environments
    // =========================================================================

    pub async fn create_environment(
        &self,
        options: EnvironmentOptions,
    ) -> WatsonResult<DetailedResponse<Environment>> {
        WatsonError::require("name", options.name.as_deref().unwrap_or_default())?;
        let builder = self
            .request(Method::POST, "/v1/environments", &[], "CreateEnvironment")?
            .json(&options)?;
        self.service.send_json(builder).await
    }

    pub async fn list_environments(
        &self,
        name: Option<&str>,
    ) -> WatsonResult<DetailedResponse<ListEnvironmentsResponse>> {
        let builder = self
            .request(Method::GET, "/v1/environments", &[], "ListEnvironments")?
            .query_opt("name", name);
        self.service.send_json(builder).await
    }

    pub async fn get_environment(
        &self,
        environment_id: &str,
    ) -> WatsonResult<DetailedResponse<Environment>> {
        let builder = self.request(
            Method::GET,
            "/v1/environments/{environment_id}",
            &[("environment_id", environment_id)],
            "GetEnvironment",
        )?;
        self.service.send_json(builder).await
    }

    pub async fn update_environment(
        &self,
        environment_id: &str,
        options: EnvironmentOptions,
    ) -> WatsonResult<DetailedResponse<Environment>> {
        let builder = self
            .request(
                Method::PUT,
                "/v1/environments/{environment_id}",
                &[("environment_id", environment_id)],
                "UpdateEnvironment",
            )?
            .json(&options)?;
        self.service.send_json(builder).await
    }

    pub async fn delete_environment(
        &self,
        environment_id: &str,
    ) -> WatsonResult<DetailedResponse<DeleteEnvironmentResponse>> {
        let builder = self.request(
            Method::DELETE,
            "/v1/environments/{environment_id}",
            &[("environment_id", environment_id)],
            "DeleteEnvironment",
        )?;
        self.service.send_json(builder).await
    }

    // =========================================================================
    // Configurations
    // =========================================================================

    pub async fn create_configuration(
        &self,
        environment_id: &str,
        configuration: &Configuration,
    ) -> WatsonResult<DetailedResponse<Configuration>> {
        WatsonError::require("name", &configuration.name)?;
        let builder = self
            .request(
                Method::POST,
                "/v1/environments/{environment_id}/configurations",
                &[("environment_id", environment_id)],
                "CreateConfiguration",
            )?
            .json(configuration)?;
        self.service.send_json(builder).await
    }

    pub async fn list_configurations(
        &self,
        environment_id: &str,
        name: Option<&str>,
    ) -> WatsonResult<DetailedResponse<ListConfigurationsResponse>> {
        let builder = self
            .request(
                Method::GET,
                "/v1/environments/{environment_id}/configurations",
                &[("environment_id", environment_id)],
                "ListConfigurations",
            )?
            .query_opt("name", name);
        self.service.send_json(builder).await
    }

    pub async fn get_configuration(
        &self,
        environment_id: &str,
        configuration_id: &str,
    ) -> WatsonResult<DetailedResponse<Configuration>> {
        let builder = self.request(
            Method::GET,
            "/v1/environments/{environment_id}/configurations/{configuration_id}",
            &[
                ("environment_id", environment_id),
                ("configuration_id", configuration_id),
            ],
            "GetConfiguration",
        )?;
        self.service.send_json(builder).await
    }

    /// Replace a configuration. Documents already ingested are not reprocessed.
    pub async fn update_configuration(
        &self,
        environment_id: &str,
        configuration_id: &str,
        configuration: &Configuration,
    ) -> WatsonResult<DetailedResponse<Configuration>> {
        WatsonError::require("name", &configuration.name)?;
        let builder = self
            .request(
                Method::PUT,
                "/v1/environments/{environment_id}/configurations/{configuration_id}",
                &[
                    ("environment_id", environment_id),
                    ("configuration_id", configuration_id),
                ],
                "UpdateConfiguration",
            )?
            .json(configuration)?;
        self.service.send_json(builder).await
    }

    pub async fn delete_configuration(
        &self,
        environment_id: &str,
        configuration_id: &str,
    ) -> WatsonResult<DetailedResponse<DeleteConfigurationResponse>> {
        let builder = self.request(
            Method::DELETE,
            "/v1/environments/{environment_id}/configurations/{configuration_id}",
            &[
                ("environment_id", environment_id),
                ("configuration_id", configuration_id),
            ],
            "DeleteConfiguration",
        )?;
        self.service.send_json(builder).await
    }

    // =========================================================================
    // Collections
    // =========================================================================

    pub async fn create_collection(
        &self,
        environment_id: &str,
        options: CollectionOptions,
    ) -> WatsonResult<DetailedResponse<Collection>> {
        WatsonError::require("name", &options.name)?;
        let builder = self
            .request(
                Method::POST,
                "/v1/environments/{environment_id}/collections",
                &[("environment_id", environment_id)],
                "CreateCollection",
            )?
            .json(&options)?;
        self.service.send_json(builder).await
    }

    pub async fn list_collections(
        &self,
        environment_id: &str,
        name: Option<&str>,
    ) -> WatsonResult<DetailedResponse<ListCollectionsResponse>> {
        let builder = self
            .request(
                Method::GET,
                "/v1/environments/{environment_id}/collections",
                &[("environment_id", environment_id)],
                "ListCollections",
            )?
            .query_opt("name", name);
        self.service.send_json(builder).await
    }

    pub async fn get_collection(
        &self,
        environment_id: &str,
        collection_id: &str,
    ) -> WatsonResult<DetailedResponse<Collection>> {
        let builder = self.request(
            Method::GET,
            "/v1/environments/{environment_id}/collections/{collection_id}",
            &[
                ("environment_id", environment_id),
                ("collection_id", collection_id),
            ],
            "GetCollection",
        )?;
        self.service.send_json(builder).await
    }

    pub async fn update_collection(
        &self,
        environment_id: &str,
        collection_id: &str,
        options: CollectionOptions,
    ) -> WatsonResult<DetailedResponse<Collection>> {
        WatsonError::require("name", &options.name)?;
        let builder = self
            .request(
                Method::PUT,
                "/v1/environments/{environment_id}/collections/{collection_id}",
                &[
                    ("environment_id", environment_id),
                    ("collection_id", collection_id),
                ],
                "UpdateCollection",
            )?
            .json(&options)?;
        self.service.send_json(builder).await
    }

    pub async fn delete_collection(
        &self,
        environment_id: &str,
        collection_id: &str,
    ) -> WatsonResult<DetailedResponse<DeleteCollectionResponse>> {
        let builder = self.request(
            Method::DELETE,
            "/v1/environments/{environment_id}/collections/{collection_id}",
            &[
                ("environment_id", environment_id),
                ("collection_id", collection_id),
            ],
            "DeleteCollection",
        )?;
        self.service.send_json(builder).await
    }

    /// Fields discovered in the collection's ingested documents.
    pub async fn list_collection_fields(
        &self,
        environment_id: &str,
        collection_id: &str,
    ) -> WatsonResult<DetailedResponse<ListCollectionFieldsResponse>> {
        let builder = self.request(
            Method::GET,
            "/v1/environments/{environment_id}/collections/{collection_id}/fields",
            &[
                ("environment_id", environment_id),
                ("collection_id", collection_id),
            ],
            "ListCollectionFields",
        )?;
        self.service.send_json(builder).await
    }

    // =========================================================================
    // Expansions
    // =========================================================================

    pub async fn list_expansions(
        &self,
        environment_id: &str,
        collection_id: &str,
    ) -> WatsonResult<DetailedResponse<Expansions>> {
        let builder = self.request(
            Method::GET,
            "/v1/environments/{environment_id}/collections/{collection_id}/expansions",
            &[
                ("environment_id", environment_id),
                ("collection_id", collection_id),
            ],
            "ListExpansions",
        )?;
        self.service.send_json(builder).await
    }

    /// Replace the collection's expansion list.
    pub async fn create_expansions(
        &self,
        environment_id: &str,
        collection_id: &str,
        expansions: &Expansions,
    ) -> WatsonResult<DetailedResponse<Expansions>> {
        if expansions.expansions.is_empty() {
            return Err(WatsonError::missing("expansions"));
        }
        if expansions
            .expansions
            .iter()
            .any(|e| e.expanded_terms.is_empty())
        {
            return Err(WatsonError::invalid(
                "expansions",
                "every expansion needs expanded_terms",
            ));
        }
        let builder = self
            .request(
                Method::POST,
                "/v1/environments/{environment_id}/collections/{collection_id}/expansions",
                &[
                    ("environment_id", environment_id),
                    ("collection_id", collection_id),
                ],
                "CreateExpansions",
            )?
            .json(expansions)?;
        self.service.send_json(builder).await
    }

    pub async fn delete_expansions(
        &self,
        environment_id: &str,
        collection_id: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        let builder = self
            .request(
                Method::DELETE,
                "/v1/environments/{environment_id}/collections/{collection_id}/expansions",
                &[
                    ("environment_id", environment_id),
                    ("collection_id", collection_id),
                ],
                "DeleteExpansions",
            )?;
        self.service.send_empty(builder).await
    }

    // =========================================================================
    // Events and user data
    // =========================================================================

    /// Record a click on a query result.
    pub async fn create_event(
        &self,
        options: &CreateEventOptions,
    ) -> WatsonResult<DetailedResponse<CreateEventResponse>> {
        let data = &options.data;
        WatsonError::require("environment_id", &data.environment_id)?;
        WatsonError::require("session_token", &data.session_token)?;
        WatsonError::require("collection_id", &data.collection_id)?;
        WatsonError::require("document_id", &data.document_id)?;
        let builder = self
            .request(Method::POST, "/v1/events", &[], "CreateEvent")?
            .json(options)?;
        self.service.send_json(builder).await
    }

    pub async fn delete_user_data(&self, customer_id: &str) -> WatsonResult<DetailedResponse<()>> {
        WatsonError::require("customer_id", customer_id)?;
        let builder = self
            .request(Method::DELETE, "/v1/user_data", &[], "DeleteUserData")?
            .query("customer_id", customer_id);
        self.service.send_empty(builder).await
    }
}
