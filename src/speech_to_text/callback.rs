//! Callback endpoint helpers.
//!
//! The service talks to a registered callback URL in two ways:
//!
//! - `GET <url>?challenge_string=<token>` while the URL is being registered.
//!   The endpoint must answer 200 with the token as a `text/plain` body
//!   within five seconds.
//! - `POST <url>` with a JSON [`JobNotification`] for every job event.
//!
//! When a user secret was supplied at registration, both carry an
//! `X-Callback-Signature` header: the base64 HMAC-SHA1 of the challenge
//! string (for `GET`) or of the request body (for `POST`), keyed with the
//! secret.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use tracing::warn;
use zeroize::Zeroizing;

use super::models::{JobEvent, SpeechRecognitionResults};
use crate::core::error::{WatsonError, WatsonResult};

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the notification signature.
pub const CALLBACK_SIGNATURE_HEADER: &str = "X-Callback-Signature";

/// Query parameter of the registration challenge.
pub const CHALLENGE_PARAM: &str = "challenge_string";

/// Body of a job notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobNotification {
    /// Job id.
    pub id: String,
    pub event: JobEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_token: Option<String>,
    /// Only sent with `recognitions.completed_with_results`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<SpeechRecognitionResults>>,
}

/// Answers registration challenges and authenticates notifications.
#[derive(Clone, Default)]
pub struct CallbackVerifier {
    user_secret: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for CallbackVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackVerifier")
            .field("user_secret", &self.user_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl CallbackVerifier {
    /// A verifier for callbacks registered without a user secret.
    pub fn new() -> Self {
        Self::default()
    }

    /// A verifier that requires every request to be signed with `secret`.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            user_secret: Some(Zeroizing::new(secret.into())),
        }
    }

    pub fn requires_signature(&self) -> bool {
        self.user_secret.is_some()
    }

    /// Base64 HMAC-SHA1 of `payload`, or `None` without a secret.
    pub fn sign(&self, payload: &[u8]) -> WatsonResult<Option<String>> {
        let Some(secret) = &self.user_secret else {
            return Ok(None);
        };
        let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
            .map_err(|e| WatsonError::Configuration(format!("Invalid callback secret: {e}")))?;
        mac.update(payload);
        Ok(Some(BASE64.encode(mac.finalize().into_bytes())))
    }

    /// Check `signature` against `payload`. Always succeeds without a secret.
    pub fn verify_signature(&self, payload: &[u8], signature: Option<&str>) -> WatsonResult<()> {
        let Some(expected) = self.sign(payload)? else {
            return Ok(());
        };
        let Some(signature) = signature else {
            warn!("Callback request without {CALLBACK_SIGNATURE_HEADER} header");
            return Err(WatsonError::InvalidSignature);
        };
        if bool::from(expected.as_bytes().ct_eq(signature.trim().as_bytes())) {
            Ok(())
        } else {
            warn!("Callback signature mismatch");
            Err(WatsonError::InvalidSignature)
        }
    }

    /// The body to answer a registration challenge with.
    pub fn answer_challenge(&self, challenge: &str, signature: Option<&str>) -> WatsonResult<String> {
        WatsonError::require(CHALLENGE_PARAM, challenge)?;
        self.verify_signature(challenge.as_bytes(), signature)?;
        Ok(challenge.to_string())
    }

    /// Authenticate and decode a notification body.
    pub fn verify_notification(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> WatsonResult<JobNotification> {
        self.verify_signature(body, signature)?;
        Ok(serde_json::from_slice(body)?)
    }
}

// =============================================================================
// axum router
// =============================================================================

#[cfg(feature = "callback-server")]
mod server {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Bytes,
        extract::{Query, State},
        http::{HeaderMap, StatusCode, header},
        response::{IntoResponse, Response},
        routing::get,
    };
    use serde::Deserialize;
    use tokio::sync::mpsc;
    use tracing::{error, info, warn};

    use super::{CALLBACK_SIGNATURE_HEADER, CallbackVerifier, JobNotification};
    use crate::core::error::WatsonError;

    #[derive(Clone)]
    struct CallbackState {
        verifier: Arc<CallbackVerifier>,
        notifications: mpsc::Sender<JobNotification>,
    }

    #[derive(Deserialize)]
    struct ChallengeQuery {
        challenge_string: Option<String>,
    }

    fn signature(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(CALLBACK_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
    }

    fn rejection(err: &WatsonError) -> StatusCode {
        match err {
            WatsonError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WatsonError::MissingParameter(_) | WatsonError::Decode(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    async fn answer_challenge(
        State(state): State<CallbackState>,
        Query(query): Query<ChallengeQuery>,
        headers: HeaderMap,
    ) -> Response {
        let challenge = query.challenge_string.unwrap_or_default();
        match state.verifier.answer_challenge(&challenge, signature(&headers)) {
            Ok(echo) => {
                info!("Answered callback registration challenge");
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "text/plain")],
                    echo,
                )
                    .into_response()
            }
            Err(e) => {
                warn!(error = %e, "Rejected callback challenge");
                rejection(&e).into_response()
            }
        }
    }

    async fn receive_notification(
        State(state): State<CallbackState>,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        let notification = match state.verifier.verify_notification(&body, signature(&headers)) {
            Ok(notification) => notification,
            Err(e) => {
                warn!(error = %e, "Rejected job notification");
                return rejection(&e);
            }
        };

        info!(
            job_id = %notification.id,
            event = notification.event.as_str(),
            "Job notification received"
        );

        match state.notifications.send(notification).await {
            Ok(()) => StatusCode::OK,
            Err(_) => {
                error!("Notification receiver dropped");
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    /// Router serving a callback URL at `/`.
    ///
    /// `GET` answers registration challenges; `POST` verifies notifications
    /// and forwards them on `notifications`. Nest it under the path of the
    /// registered URL.
    pub fn callback_router(
        verifier: CallbackVerifier,
        notifications: mpsc::Sender<JobNotification>,
    ) -> Router {
        let state = CallbackState {
            verifier: Arc::new(verifier),
            notifications,
        };
        Router::new()
            .route("/", get(answer_challenge).post(receive_notification))
            .with_state(state)
    }
}

#[cfg(feature = "callback-server")]
pub use server::callback_router;
