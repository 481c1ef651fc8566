//! Request construction shared by all generated operations.
//!
//! A [`RequestBuilder`] collects the pieces of one API call (path template
//! with its parameters, query string, extra headers and body) and is turned
//! into a `reqwest::Request` by [`crate::core::service::BaseService`].

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use url::Url;

use super::error::{WatsonError, WatsonResult};
use super::telemetry::Operation;

/// Body of an outgoing request.
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Bytes { data: Bytes, content_type: String },
    Multipart(Form),
}

/// Builder for a single service request.
#[derive(Debug)]
pub struct RequestBuilder {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) operation: Operation,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: RequestBody,
    pub(crate) accept: Option<&'static str>,
}

/// Substitute `{name}` segments of `template` and append them to `base`.
///
/// Each substituted value becomes exactly one percent-encoded path segment,
/// so values containing `/`, `?` or spaces cannot escape their segment.
pub fn resolve_path(base: &Url, template: &str, params: &[(&str, &str)]) -> WatsonResult<Url> {
    let mut url = base.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|_| {
            WatsonError::Configuration(format!("Service URL cannot be a base: {base}"))
        })?;
        segments.pop_if_empty();

        for segment in template.split('/').filter(|s| !s.is_empty()) {
            match segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
            {
                Some(name) => {
                    let value = params
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| WatsonError::missing(name))?;
                    if value.is_empty() {
                        return Err(WatsonError::missing(name));
                    }
                    // `Url` drops dot segments instead of encoding them.
                    if value == "." || value == ".." {
                        return Err(WatsonError::invalid(name, "must not be a dot segment"));
                    }
                    segments.push(value);
                }
                None => {
                    segments.push(segment);
                }
            }
        }
    }
    Ok(url)
}

impl RequestBuilder {
    pub(crate) fn new(method: Method, url: Url, operation: Operation) -> Self {
        Self {
            method,
            url,
            operation,
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            accept: Some("application/json"),
        }
    }

    /// Add a query parameter.
    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter when `value` is set.
    pub fn query_opt<T: ToString>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.query(name, v),
            None => self,
        }
    }

    /// Add a comma separated list parameter when the list is non-empty.
    pub fn query_list<T: AsRef<str>>(self, name: &str, values: &[T]) -> Self {
        if values.is_empty() {
            return self;
        }
        let joined = values
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");
        self.query(name, joined)
    }

    /// Add a header. Invalid names or values are reported as parameter errors.
    pub fn header(mut self, name: &str, value: &str) -> WatsonResult<Self> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| WatsonError::invalid(name, e.to_string()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| WatsonError::invalid(name, e.to_string()))?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Add a header when `value` is set.
    pub fn header_opt(self, name: &str, value: Option<&str>) -> WatsonResult<Self> {
        match value {
            Some(v) => self.header(name, v),
            None => Ok(self),
        }
    }

    /// Expected response content type (`Accept` header). `None` sends no header.
    pub fn accept(mut self, accept: Option<&'static str>) -> Self {
        self.accept = accept;
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> WatsonResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| WatsonError::invalid("body", e.to_string()))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    /// Use raw bytes as the request body.
    pub fn bytes(mut self, data: Bytes, content_type: impl Into<String>) -> Self {
        self.body = RequestBody::Bytes {
            data,
            content_type: content_type.into(),
        };
        self
    }

    /// Use a multipart form as the request body.
    pub fn multipart(mut self, form: Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// The operation this request belongs to.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The resolved URL, without query parameters.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Query parameters added so far.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }
}

/// Build a multipart file part with an optional filename and content type.
pub fn file_part(
    field: &str,
    data: Bytes,
    filename: Option<&str>,
    content_type: Option<&str>,
) -> WatsonResult<Part> {
    let length = data.len() as u64;
    let mut part = Part::stream_with_length(reqwest::Body::from(data), length)
        .file_name(filename.unwrap_or(field).to_string());
    if let Some(ct) = content_type {
        part = part
            .mime_str(ct)
            .map_err(|e| WatsonError::invalid(field, format!("invalid content type: {e}")))?;
    }
    Ok(part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::telemetry::Operation;

    const OP: Operation = Operation::new("test", "V1", "Test");

    #[test]
    fn test_resolve_path_substitutes_and_encodes() {
        let base = Url::parse("https://api.example.com/instances/abc").unwrap();
        let url = resolve_path(
            &base,
            "/v1/customizations/{customization_id}/words/{word_name}",
            &[("customization_id", "cust-1"), ("word_name", "a/b c?")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/instances/abc/v1/customizations/cust-1/words/a%2Fb%20c%3F"
        );
    }

    #[test]
    fn test_resolve_path_handles_trailing_slash() {
        let base = Url::parse("https://api.example.com/").unwrap();
        let url = resolve_path(&base, "/v1/models", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/models");
    }

    #[test]
    fn test_resolve_path_missing_or_empty_param() {
        let base = Url::parse("https://api.example.com").unwrap();
        let err = resolve_path(&base, "/v1/recognitions/{id}", &[]).unwrap_err();
        assert!(matches!(err, WatsonError::MissingParameter(ref n) if n == "id"));

        let err = resolve_path(&base, "/v1/recognitions/{id}", &[("id", "")]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_resolve_path_rejects_dot_segments() {
        let base = Url::parse("https://api.example.com").unwrap();
        for value in [".", ".."] {
            let err = resolve_path(
                &base,
                "/v1/customizations/{customization_id}/words/{word_name}",
                &[("customization_id", "cust-1"), ("word_name", value)],
            )
            .unwrap_err();
            assert!(
                matches!(err, WatsonError::InvalidParameter { ref name, .. } if name == "word_name")
            );
        }

        let url = resolve_path(&base, "/v1/recognitions/{id}", &[("id", "...")]).unwrap();
        assert_eq!(url.path(), "/v1/recognitions/...");
    }

    #[test]
    fn test_query_helpers() {
        let url = Url::parse("https://api.example.com/v1/recognize").unwrap();
        let builder = RequestBuilder::new(Method::POST, url, OP)
            .query("model", "en-US_BroadbandModel")
            .query_opt::<u32>("max_alternatives", None)
            .query_opt("timestamps", Some(true))
            .query_list("keywords", &["alpha", "beta"])
            .query_list::<&str>("empty", &[]);

        assert_eq!(
            builder.query_pairs(),
            &[
                ("model".to_string(), "en-US_BroadbandModel".to_string()),
                ("timestamps".to_string(), "true".to_string()),
                ("keywords".to_string(), "alpha,beta".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_header_rejected() {
        let url = Url::parse("https://api.example.com").unwrap();
        let result = RequestBuilder::new(Method::GET, url, OP).header("X-Bad", "line\nbreak");
        assert!(matches!(result, Err(WatsonError::InvalidParameter { .. })));
    }
}
