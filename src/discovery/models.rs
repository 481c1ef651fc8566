//! Discovery V1 data model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Environments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentStatus {
    Active,
    Pending,
    Maintenance,
    Resizing,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub environment_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    pub status: EnvironmentStatus,
    #[serde(default)]
    pub read_only: bool,
    /// `LT`, `XS`, `S`, `MS`, `M`, `ML`, `L`, `XL`, `XXL`, `XXXL`
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub requested_size: Option<String>,
    #[serde(default)]
    pub index_capacity: Option<Value>,
    #[serde(default)]
    pub search_status: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListEnvironmentsResponse {
    #[serde(default)]
    pub environments: Vec<Environment>,
}

/// Body of `create_environment` and `update_environment`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnvironmentOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl EnvironmentOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteEnvironmentResponse {
    pub environment_id: String,
    pub status: String,
}

// =============================================================================
// Configurations
// =============================================================================

/// Document conversion, enrichment and normalization settings.
///
/// The nested settings are kept as JSON; their shape depends on the
/// source formats and enrichments in use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversions: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enrichments: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normalizations: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
}

impl Configuration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListConfigurationsResponse {
    #[serde(default)]
    pub configurations: Vec<Configuration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteConfigurationResponse {
    pub configuration_id: String,
    pub status: String,
    #[serde(default)]
    pub notices: Vec<Notice>,
}

// =============================================================================
// Collections
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Active,
    Pending,
    Maintenance,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentCounts {
    pub available: i64,
    pub processing: i64,
    pub failed: i64,
    pub pending: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub collection_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default = "unknown_collection_status")]
    pub status: CollectionStatus,
    #[serde(default)]
    pub configuration_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub document_counts: Option<DocumentCounts>,
    #[serde(default)]
    pub disk_usage: Option<Value>,
    #[serde(default)]
    pub training_status: Option<Value>,
}

fn unknown_collection_status() -> CollectionStatus {
    CollectionStatus::Unknown
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListCollectionsResponse {
    #[serde(default)]
    pub collections: Vec<Collection>,
}

/// Body of `create_collection` and `update_collection`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionOptions {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_id: Option<String>,
    /// Only honoured on creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl CollectionOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_configuration_id(mut self, configuration_id: impl Into<String>) -> Self {
        self.configuration_id = Some(configuration_id.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCollectionResponse {
    pub collection_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListCollectionFieldsResponse {
    #[serde(default)]
    pub fields: Vec<Field>,
}

// =============================================================================
// Query expansions
// =============================================================================

/// One expansion. Without `input_terms` the expansion is bidirectional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_terms: Vec<String>,
    pub expanded_terms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expansions {
    #[serde(default)]
    pub expansions: Vec<Expansion>,
}

// =============================================================================
// Documents
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    #[serde(default)]
    pub notice_id: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub query_id: Option<String>,
    /// `warning` or `error`.
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAccepted {
    #[serde(default)]
    pub document_id: Option<String>,
    /// `processing` or `pending`.
    pub status: String,
    #[serde(default)]
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStatus {
    pub document_id: String,
    #[serde(default)]
    pub configuration_id: Option<String>,
    /// `available`, `available with notices`, `failed`, `processing` or `pending`.
    pub status: String,
    #[serde(default)]
    pub status_description: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDocumentResponse {
    #[serde(default)]
    pub document_id: Option<String>,
    pub status: String,
}

// =============================================================================
// Queries
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub result_metadata: Option<Value>,
    /// The document's own fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPassage {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub passage_score: Option<f64>,
    #[serde(default)]
    pub passage_text: Option<String>,
    #[serde(default)]
    pub start_offset: Option<i64>,
    #[serde(default)]
    pub end_offset: Option<i64>,
    #[serde(default)]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub matching_results: i64,
    #[serde(default)]
    pub results: Vec<QueryResult>,
    #[serde(default)]
    pub aggregations: Vec<Value>,
    #[serde(default)]
    pub passages: Vec<QueryPassage>,
    #[serde(default)]
    pub duplicates_removed: Option<i64>,
    /// Pass to `create_event` to attribute clicks to this query.
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub retrieval_details: Option<Value>,
    #[serde(default)]
    pub suggested_query: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryNoticesResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub notices: Vec<Notice>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryNoticesResponse {
    #[serde(default)]
    pub matching_results: i64,
    #[serde(default)]
    pub results: Vec<QueryNoticesResult>,
    #[serde(default)]
    pub aggregations: Vec<Value>,
    #[serde(default)]
    pub passages: Vec<QueryPassage>,
    #[serde(default)]
    pub duplicates_removed: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completions {
    #[serde(default)]
    pub completions: Vec<String>,
}

// =============================================================================
// Training data
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_reference: Option<String>,
    pub relevance: i64,
}

impl TrainingExample {
    pub fn new(document_id: impl Into<String>, relevance: i64) -> Self {
        Self {
            document_id: document_id.into(),
            cross_reference: None,
            relevance,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_language_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<TrainingExample>,
}

impl TrainingQuery {
    pub fn new(natural_language_query: impl Into<String>) -> Self {
        Self {
            natural_language_query: Some(natural_language_query.into()),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_examples(mut self, examples: impl IntoIterator<Item = TrainingExample>) -> Self {
        self.examples = examples.into_iter().collect();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingDataSet {
    #[serde(default)]
    pub environment_id: Option<String>,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub queries: Vec<TrainingQuery>,
}

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Click,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub environment_id: String,
    /// From the `session_token` of the query response.
    pub session_token: String,
    pub collection_id: String,
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_rank: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventOptions {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: EventData,
}

impl CreateEventOptions {
    pub fn click(data: EventData) -> Self {
        Self {
            event_type: EventType::Click,
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventResponse {
    #[serde(rename = "type", default)]
    pub event_type: Option<EventType>,
    #[serde(default)]
    pub data: Option<EventData>,
}
