//! Asynchronous recognition jobs and callback registration.
//!
//! A job is created with `create_job`, then followed either by polling
//! `check_job` (see [`SpeechToTextV1::wait_for_job`]) or by notifications sent
//! to a callback URL registered beforehand with `register_callback`.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::models::{JobEvent, JobStatus, RecognitionJob, RecognitionJobs, RegisterStatus};
use super::recognize::{RecognitionParams, validate_audio};
use super::{SpeechToTextV1, op};
use crate::core::error::{WatsonError, WatsonResult};
use crate::core::service::DetailedResponse;
use crate::utils::url_validation::validate_callback_url;

const DEFAULT_AUDIO_CONTENT_TYPE: &str = "application/octet-stream";

// =============================================================================
// Options
// =============================================================================

/// Options for [`SpeechToTextV1::register_callback`].
#[derive(Clone)]
pub struct RegisterCallbackOptions {
    pub callback_url: String,
    /// Secret used by the service to sign the challenge and every notification.
    pub user_secret: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for RegisterCallbackOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterCallbackOptions")
            .field("callback_url", &self.callback_url)
            .field("user_secret", &self.user_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl RegisterCallbackOptions {
    pub fn new(callback_url: impl Into<String>) -> Self {
        Self {
            callback_url: callback_url.into(),
            user_secret: None,
        }
    }

    pub fn with_user_secret(mut self, secret: impl Into<String>) -> Self {
        self.user_secret = Some(Zeroizing::new(secret.into()));
        self
    }
}

/// Options for [`SpeechToTextV1::create_job`].
#[derive(Debug, Clone)]
pub struct CreateJobOptions {
    pub audio: Bytes,
    pub content_type: Option<String>,
    /// Previously registered URL that receives job notifications.
    pub callback_url: Option<String>,
    /// Notifications to send; requires `callback_url`.
    pub events: Vec<JobEvent>,
    /// Echoed back in notifications; requires `callback_url`.
    pub user_token: Option<String>,
    /// Minutes the finished job is kept. The service keeps it one week when unset.
    pub results_ttl: Option<u32>,
    pub params: RecognitionParams,
}

impl CreateJobOptions {
    pub fn new(audio: impl Into<Bytes>) -> Self {
        Self {
            audio: audio.into(),
            content_type: None,
            callback_url: None,
            events: Vec::new(),
            user_token: None,
            results_ttl: None,
            params: RecognitionParams::default(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_callback_url(mut self, callback_url: impl Into<String>) -> Self {
        self.callback_url = Some(callback_url.into());
        self
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = JobEvent>) -> Self {
        self.events = events.into_iter().collect();
        self
    }

    pub fn with_user_token(mut self, user_token: impl Into<String>) -> Self {
        self.user_token = Some(user_token.into());
        self
    }

    pub fn with_results_ttl(mut self, minutes: u32) -> Self {
        self.results_ttl = Some(minutes);
        self
    }

    pub fn with_params(mut self, params: RecognitionParams) -> Self {
        self.params = params;
        self
    }

    fn validate(&self) -> WatsonResult<()> {
        validate_audio(&self.audio)?;
        self.params.validate()?;

        match &self.callback_url {
            Some(url) => {
                WatsonError::require("callback_url", url)?;
                validate_callback_url(url)
                    .map_err(|e| WatsonError::invalid("callback_url", e.to_string()))?;
            }
            None => {
                if !self.events.is_empty() {
                    return Err(WatsonError::invalid("events", "requires callback_url"));
                }
                if self.user_token.is_some() {
                    return Err(WatsonError::invalid("user_token", "requires callback_url"));
                }
            }
        }

        if self.events.contains(&JobEvent::Unknown) {
            return Err(WatsonError::invalid("events", "unknown event"));
        }
        if self.events.contains(&JobEvent::Completed)
            && self.events.contains(&JobEvent::CompletedWithResults)
        {
            return Err(WatsonError::invalid(
                "events",
                "recognitions.completed and recognitions.completed_with_results are mutually exclusive",
            ));
        }
        if self.results_ttl == Some(0) {
            return Err(WatsonError::invalid("results_ttl", "must be at least 1 minute"));
        }
        Ok(())
    }
}

/// Options for [`SpeechToTextV1::wait_for_job`].
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    /// Delay between two status checks.
    pub interval: Duration,
    /// Give up after this long; `None` waits until the job finishes.
    pub timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: None,
        }
    }
}

impl PollOptions {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// =============================================================================
// Operations
// =============================================================================

impl SpeechToTextV1 {
    /// Allowlist a callback URL.
    ///
    /// The service challenges the URL with `GET <url>?challenge_string=<token>`
    /// before answering; an endpoint that does not echo the token within five
    /// seconds makes this call fail with [`WatsonError::Service`]. HTTP 201
    /// means the URL was newly registered, 200 that it already was.
    pub async fn register_callback(
        &self,
        options: RegisterCallbackOptions,
    ) -> WatsonResult<DetailedResponse<RegisterStatus>> {
        WatsonError::require("callback_url", &options.callback_url)?;
        validate_callback_url(&options.callback_url)
            .map_err(|e| WatsonError::invalid("callback_url", e.to_string()))?;

        let builder = self
            .service
            .request(
                Method::POST,
                "/v1/register_callback",
                &[],
                op("RegisterCallback"),
            )?
            .query("callback_url", &options.callback_url)
            .query_opt("user_secret", options.user_secret.as_ref().map(|s| s.as_str()));

        let response = self.service.send_json::<RegisterStatus>(builder).await?;
        info!(
            callback_url = %response.result.url,
            status = response.status_code,
            "Callback registered"
        );
        Ok(response)
    }

    /// Remove a callback URL from the allowlist.
    pub async fn unregister_callback(
        &self,
        callback_url: &str,
    ) -> WatsonResult<DetailedResponse<()>> {
        WatsonError::require("callback_url", callback_url)?;
        let builder = self
            .service
            .request(
                Method::POST,
                "/v1/unregister_callback",
                &[],
                op("UnregisterCallback"),
            )?
            .query("callback_url", callback_url);
        self.service.send_empty(builder).await
    }

    /// Submit audio for asynchronous recognition.
    pub async fn create_job(
        &self,
        options: CreateJobOptions,
    ) -> WatsonResult<DetailedResponse<RecognitionJob>> {
        options.validate()?;

        let events = options
            .events
            .iter()
            .map(JobEvent::as_str)
            .collect::<Vec<_>>();

        let builder = self
            .service
            .request(Method::POST, "/v1/recognitions", &[], op("CreateJob"))?
            .query_opt("callback_url", options.callback_url.as_deref())
            .query_list("events", &events)
            .query_opt("user_token", options.user_token.as_deref())
            .query_opt("results_ttl", options.results_ttl);
        let builder = options.params.apply(builder).bytes(
            options.audio,
            options
                .content_type
                .unwrap_or_else(|| DEFAULT_AUDIO_CONTENT_TYPE.to_string()),
        );

        let response = self.service.send_json::<RecognitionJob>(builder).await?;
        info!(
            job_id = %response.result.id,
            status = %response.result.status,
            "Recognition job created"
        );
        Ok(response)
    }

    /// Status of the latest jobs (up to 100) created with the same credentials.
    pub async fn check_jobs(&self) -> WatsonResult<DetailedResponse<RecognitionJobs>> {
        let builder = self
            .service
            .request(Method::GET, "/v1/recognitions", &[], op("CheckJobs"))?;
        self.service.send_json(builder).await
    }

    /// Status of one job; carries the results once it completed.
    pub async fn check_job(&self, id: &str) -> WatsonResult<DetailedResponse<RecognitionJob>> {
        let builder = self.service.request(
            Method::GET,
            "/v1/recognitions/{id}",
            &[("id", id)],
            op("CheckJob"),
        )?;
        self.service.send_json(builder).await
    }

    /// Delete a job. The service refuses while the job is `processing`.
    pub async fn delete_job(&self, id: &str) -> WatsonResult<DetailedResponse<()>> {
        let builder = self
            .service
            .request(
                Method::DELETE,
                "/v1/recognitions/{id}",
                &[("id", id)],
                op("DeleteJob"),
            )?;
        self.service.send_empty(builder).await
    }

    /// Poll `check_job` until the job reaches `completed` or `failed`.
    ///
    /// The first failed request ends the wait; nothing is retried.
    pub async fn wait_for_job(&self, id: &str, options: PollOptions) -> WatsonResult<RecognitionJob> {
        WatsonError::require("id", id)?;
        let deadline = options.timeout.map(|t| Instant::now() + t);
        let mut last_status: Option<JobStatus> = None;

        loop {
            let job = self.check_job(id).await?.into_result();

            if let Some(previous) = last_status
                && let (Some(prev_rank), Some(rank)) = (previous.rank(), job.status.rank())
                && rank < prev_rank
            {
                warn!(job_id = id, from = %previous, to = %job.status, "Job status went backwards");
            }
            if last_status != Some(job.status) {
                debug!(job_id = id, status = %job.status, "Job status");
            }
            last_status = Some(job.status);

            if job.status.is_terminal() {
                return Ok(job);
            }

            let delay = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(WatsonError::Timeout(format!(
                            "job {id} still {} after {:?}",
                            job.status,
                            options.timeout.unwrap_or_default()
                        )));
                    }
                    options.interval.min(remaining)
                }
                None => options.interval,
            };
            sleep(delay).await;
        }
    }
}
