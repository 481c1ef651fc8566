//! Base service shared by every Watson client.
//!
//! `BaseService` owns the HTTP client, the service URL and the
//! authenticator. Each operation asks it for a [`RequestBuilder`], fills in
//! parameters and hands the builder back to one of the `send_*` methods,
//! which authenticate, attach telemetry headers, dispatch and decode.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::HeaderMap;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

use super::auth::BoxedAuthenticator;
use super::error::{ServiceError, TRANSACTION_ID_HEADER, WatsonError, WatsonResult};
use super::request::{RequestBody, RequestBuilder, resolve_path};
use super::telemetry::{ANALYTICS_HEADER, Operation, user_agent};
use crate::utils::url_validation::validate_service_url;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// Options
// =============================================================================

/// Settings needed to construct a service client.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Base URL of the service instance.
    pub url: String,
    /// Credentials provider.
    pub authenticator: BoxedAuthenticator,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Accept invalid TLS certificates (testing against private deployments only).
    pub disable_ssl_verification: bool,
    /// Headers sent with every request.
    pub default_headers: HeaderMap,
}

impl ServiceOptions {
    pub fn new(url: impl Into<String>, authenticator: BoxedAuthenticator) -> Self {
        Self {
            url: url.into(),
            authenticator,
            timeout: DEFAULT_TIMEOUT,
            disable_ssl_verification: false,
            default_headers: HeaderMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_disable_ssl_verification(mut self, disable: bool) -> Self {
        self.disable_ssl_verification = disable;
        self
    }

    pub fn with_default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }
}

// =============================================================================
// Responses
// =============================================================================

/// A decoded result together with the HTTP status and headers it came with.
#[derive(Debug, Clone)]
pub struct DetailedResponse<T> {
    pub status_code: u16,
    pub headers: HeaderMap,
    pub result: T,
}

impl<T> DetailedResponse<T> {
    /// Discard status and headers.
    pub fn into_result(self) -> T {
        self.result
    }

    /// Transaction id reported by the service, if any.
    pub fn transaction_id(&self) -> Option<&str> {
        self.headers
            .get(TRANSACTION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DetailedResponse<U> {
        DetailedResponse {
            status_code: self.status_code,
            headers: self.headers,
            result: f(self.result),
        }
    }
}

// =============================================================================
// BaseService
// =============================================================================

/// HTTP plumbing shared by the service clients.
#[derive(Debug, Clone)]
pub struct BaseService {
    client: Client,
    url: Url,
    authenticator: BoxedAuthenticator,
    default_headers: HeaderMap,
}

impl BaseService {
    /// Validate `options` and build the HTTP client.
    pub fn new(options: ServiceOptions) -> WatsonResult<Self> {
        options.authenticator.validate()?;
        let url = validate_service_url(&options.url)?;

        let client = Client::builder()
            .timeout(options.timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .danger_accept_invalid_certs(options.disable_ssl_verification)
            .build()
            .map_err(|e| WatsonError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            authenticator: options.authenticator,
            default_headers: options.default_headers,
        })
    }

    /// Base URL of the service.
    pub fn service_url(&self) -> &Url {
        &self.url
    }

    /// Change the base URL (for example to switch regions).
    pub fn set_service_url(&mut self, url: &str) -> WatsonResult<()> {
        self.url = validate_service_url(url)?;
        Ok(())
    }

    pub fn authenticator(&self) -> &BoxedAuthenticator {
        &self.authenticator
    }

    /// Start a request for `template`, substituting `path_params`.
    pub fn request(
        &self,
        method: Method,
        template: &str,
        path_params: &[(&str, &str)],
        operation: Operation,
    ) -> WatsonResult<RequestBuilder> {
        let url = resolve_path(&self.url, template, path_params)?;
        Ok(RequestBuilder::new(method, url, operation))
    }

    /// Send and decode a JSON response body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> WatsonResult<DetailedResponse<T>> {
        let operation = builder.operation;
        let (status, headers, body) = self.execute(builder).await?;
        let result = serde_json::from_slice::<T>(&body).map_err(|e| {
            error!(operation = %operation, error = %e, "Failed to decode response body");
            WatsonError::Decode(format!("{operation}: {e}"))
        })?;
        Ok(DetailedResponse {
            status_code: status.as_u16(),
            headers,
            result,
        })
    }

    /// Send a request whose response body carries nothing of interest.
    ///
    /// No `Accept` header is sent.
    pub async fn send_empty(&self, builder: RequestBuilder) -> WatsonResult<DetailedResponse<()>> {
        let (status, headers, _) = self.execute(builder.accept(None)).await?;
        Ok(DetailedResponse {
            status_code: status.as_u16(),
            headers,
            result: (),
        })
    }

    /// Send and return the raw response body.
    pub async fn send_bytes(&self, builder: RequestBuilder) -> WatsonResult<DetailedResponse<Bytes>> {
        let (status, headers, body) = self.execute(builder).await?;
        Ok(DetailedResponse {
            status_code: status.as_u16(),
            headers,
            result: body,
        })
    }

    async fn execute(&self, builder: RequestBuilder) -> WatsonResult<(StatusCode, HeaderMap, Bytes)> {
        let RequestBuilder {
            method,
            mut url,
            operation,
            query,
            headers: extra_headers,
            body,
            accept,
        } = builder;

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }

        let mut headers = self.default_headers.clone();
        headers.insert(USER_AGENT, HeaderValue::from_static(user_agent()));
        headers.insert(
            ANALYTICS_HEADER,
            HeaderValue::from_str(&operation.analytics_header())
                .map_err(|e| WatsonError::Configuration(e.to_string()))?,
        );
        if let Some(accept) = accept {
            headers.insert(ACCEPT, HeaderValue::from_static(accept));
        }
        headers.extend(extra_headers);
        self.authenticator.authenticate(&mut headers).await?;

        let mut request = self.client.request(method.clone(), url.clone()).headers(headers);
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Bytes { data, content_type } => request
                .header(CONTENT_TYPE, content_type)
                .body(data),
            RequestBody::Multipart(form) => request.multipart(form),
        };

        debug!(operation = %operation, method = %method, url = %url, "Sending request");

        let response = request.send().await.map_err(|e| {
            error!(operation = %operation, error = %e, "Request failed");
            transport_error(format!("{operation}: {e}"), &e)
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            transport_error(format!("{operation}: failed to read response body: {e}"), &e)
        })?;

        if !status.is_success() {
            let service_error =
                ServiceError::from_response(status.as_u16(), &headers, &String::from_utf8_lossy(&body));
            error!(
                operation = %operation,
                status = status.as_u16(),
                message = %service_error.message,
                transaction_id = service_error.transaction_id.as_deref().unwrap_or("-"),
                "Service returned error"
            );
            return Err(WatsonError::Service(Box::new(service_error)));
        }

        debug!(
            operation = %operation,
            status = status.as_u16(),
            bytes = body.len(),
            "Received response"
        );

        Ok((status, headers, body))
    }
}

fn transport_error(message: String, err: &reqwest::Error) -> WatsonError {
    if err.is_timeout() {
        WatsonError::Timeout(message)
    } else {
        WatsonError::Network(message)
    }
}

/// Wrap an authenticator for [`ServiceOptions`].
pub fn shared<A: super::auth::Authenticator + 'static>(authenticator: A) -> BoxedAuthenticator {
    Arc::new(authenticator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::NoAuthAuthenticator;

    #[test]
    fn test_service_rejects_bad_url() {
        let options = ServiceOptions::new("not a url", shared(NoAuthAuthenticator));
        assert!(matches!(
            BaseService::new(options),
            Err(WatsonError::Configuration(_))
        ));
    }

    #[test]
    fn test_request_resolves_against_service_url() {
        let service = BaseService::new(ServiceOptions::new(
            "https://api.us-south.speech-to-text.watson.cloud.ibm.com/instances/1234",
            shared(NoAuthAuthenticator),
        ))
        .unwrap();

        let builder = service
            .request(
                Method::GET,
                "/v1/models/{model_id}",
                &[("model_id", "en-US_BroadbandModel")],
                Operation::new("speech_to_text", "V1", "GetModel"),
            )
            .unwrap();

        assert_eq!(
            builder.url().as_str(),
            "https://api.us-south.speech-to-text.watson.cloud.ibm.com/instances/1234/v1/models/en-US_BroadbandModel"
        );
    }

    #[test]
    fn test_detailed_response_map() {
        let response = DetailedResponse {
            status_code: 201,
            headers: HeaderMap::new(),
            result: 2,
        };
        let mapped = response.map(|v| v * 10);
        assert_eq!(mapped.status_code, 201);
        assert_eq!(mapped.into_result(), 20);
    }
}
