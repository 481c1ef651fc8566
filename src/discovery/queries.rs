//! Collection queries, notices, federated queries and autocompletion.

use reqwest::Method;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::DiscoveryV1;
use super::models::{Completions, QueryNoticesResponse, QueryResponse};
use crate::core::error::{WatsonError, WatsonResult};
use crate::core::request::RequestBuilder;
use crate::core::service::DetailedResponse;

const LOGGING_OPT_OUT_HEADER: &str = "X-Watson-Logging-Opt-Out";

/// Lists travel as comma separated strings in both query strings and bodies.
fn comma_list<S: Serializer>(values: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&values.join(","))
}

/// Search parameters shared by `query`, `query_notices` and `federated_query`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Discovery Query Language. Exclusive with `natural_language_query`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_language_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passages: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(
        rename = "return",
        serialize_with = "comma_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub return_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Prefix a field with `-` for descending order.
    #[serde(serialize_with = "comma_list", skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<bool>,
    #[serde(
        rename = "passages.fields",
        serialize_with = "comma_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub passages_fields: Vec<String>,
    #[serde(rename = "passages.count", skip_serializing_if = "Option::is_none")]
    pub passages_count: Option<u32>,
    #[serde(rename = "passages.characters", skip_serializing_if = "Option::is_none")]
    pub passages_characters: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplicate: Option<bool>,
    #[serde(rename = "deduplicate.field", skip_serializing_if = "Option::is_none")]
    pub deduplicate_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similar: Option<bool>,
    #[serde(
        rename = "similar.document_ids",
        serialize_with = "comma_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub similar_document_ids: Vec<String>,
    #[serde(
        rename = "similar.fields",
        serialize_with = "comma_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub similar_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spelling_suggestions: Option<bool>,
    /// Sent as the `X-Watson-Logging-Opt-Out` header.
    #[serde(skip)]
    pub logging_opt_out: Option<bool>,
}

impl QueryOptions {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_natural_language_query(mut self, query: impl Into<String>) -> Self {
        self.natural_language_query = Some(query.into());
        self
    }

    pub fn with_passages(mut self, passages: bool) -> Self {
        self.passages = Some(passages);
        self
    }

    pub fn with_aggregation(mut self, aggregation: impl Into<String>) -> Self {
        self.aggregation = Some(aggregation.into());
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_return_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.return_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sort<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = Some(highlight);
        self
    }

    pub fn with_deduplicate_field(mut self, field: impl Into<String>) -> Self {
        self.deduplicate_field = Some(field.into());
        self
    }

    pub fn with_similar_document_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.similar = Some(true);
        self.similar_document_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_spelling_suggestions(mut self, enabled: bool) -> Self {
        self.spelling_suggestions = Some(enabled);
        self
    }

    pub fn with_logging_opt_out(mut self, opt_out: bool) -> Self {
        self.logging_opt_out = Some(opt_out);
        self
    }

    fn validate(&self) -> WatsonResult<()> {
        if self.query.is_some() && self.natural_language_query.is_some() {
            return Err(WatsonError::invalid(
                "natural_language_query",
                "cannot be combined with query",
            ));
        }
        if self.similar_document_ids.is_empty() && !self.similar_fields.is_empty() {
            return Err(WatsonError::invalid(
                "similar.fields",
                "requires similar.document_ids",
            ));
        }
        Ok(())
    }

    /// Flattened `name=value` pairs for GET endpoints.
    fn query_pairs(&self) -> WatsonResult<Vec<(String, String)>> {
        let Value::Object(map) =
            serde_json::to_value(self).map_err(|e| WatsonError::invalid("query", e.to_string()))?
        else {
            return Ok(Vec::new());
        };
        Ok(map
            .into_iter()
            .map(|(name, value)| match value {
                Value::String(s) => (name, s),
                other => (name, other.to_string()),
            })
            .collect())
    }

    fn apply_header(&self, builder: RequestBuilder) -> WatsonResult<RequestBuilder> {
        builder.header_opt(
            LOGGING_OPT_OUT_HEADER,
            self.logging_opt_out
                .map(|v| if v { "true" } else { "false" }),
        )
    }
}

/// A query across several collections of one environment.
#[derive(Debug, Clone, Serialize)]
pub struct FederatedQueryOptions {
    #[serde(serialize_with = "comma_list")]
    pub collection_ids: Vec<String>,
    #[serde(flatten)]
    pub query: QueryOptions,
}

impl FederatedQueryOptions {
    pub fn new<I, S>(collection_ids: I, query: QueryOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collection_ids: collection_ids.into_iter().map(Into::into).collect(),
            query,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutocompletionOptions {
    pub prefix: String,
    pub field: Option<String>,
    pub count: Option<u32>,
}

impl AutocompletionOptions {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            field: None,
            count: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }
}

impl DiscoveryV1 {
    pub async fn query(
        &self,
        environment_id: &str,
        collection_id: &str,
        options: QueryOptions,
    ) -> WatsonResult<DetailedResponse<QueryResponse>> {
        options.validate()?;
        let builder = self.request(
            Method::POST,
            "/v1/environments/{environment_id}/collections/{collection_id}/query",
            &[
                ("environment_id", environment_id),
                ("collection_id", collection_id),
            ],
            "Query",
        )?;
        let builder = options.apply_header(builder)?.json(&options)?;
        self.service.send_json(builder).await
    }

    /// Query the notices generated while ingesting documents.
    pub async fn query_notices(
        &self,
        environment_id: &str,
        collection_id: &str,
        options: QueryOptions,
    ) -> WatsonResult<DetailedResponse<QueryNoticesResponse>> {
        options.validate()?;
        let mut builder = self.request(
            Method::GET,
            "/v1/environments/{environment_id}/collections/{collection_id}/notices",
            &[
                ("environment_id", environment_id),
                ("collection_id", collection_id),
            ],
            "QueryNotices",
        )?;
        for (name, value) in options.query_pairs()? {
            builder = builder.query(&name, value);
        }
        self.service.send_json(builder).await
    }

    pub async fn federated_query(
        &self,
        environment_id: &str,
        options: FederatedQueryOptions,
    ) -> WatsonResult<DetailedResponse<QueryResponse>> {
        if options.collection_ids.iter().all(|id| id.trim().is_empty()) {
            return Err(WatsonError::missing("collection_ids"));
        }
        options.query.validate()?;
        let builder = self.request(
            Method::POST,
            "/v1/environments/{environment_id}/query",
            &[("environment_id", environment_id)],
            "FederatedQuery",
        )?;
        let builder = options.query.apply_header(builder)?.json(&options)?;
        self.service.send_json(builder).await
    }

    /// Completions for a partial query term.
    pub async fn get_autocompletion(
        &self,
        environment_id: &str,
        collection_id: &str,
        options: AutocompletionOptions,
    ) -> WatsonResult<DetailedResponse<Completions>> {
        WatsonError::require("prefix", &options.prefix)?;
        let builder = self
            .request(
                Method::GET,
                "/v1/environments/{environment_id}/collections/{collection_id}/autocompletion",
                &[
                    ("environment_id", environment_id),
                    ("collection_id", collection_id),
                ],
                "GetAutocompletion",
            )?
            .query("prefix", &options.prefix)
            .query_opt("field", options.field.as_deref())
            .query_opt("count", options.count);
        self.service.send_json(builder).await
    }
}
