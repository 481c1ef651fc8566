//! Asynchronous recognition job lifecycle against a mocked service.
//!
//! Covers:
//! - Validation failures never reach the network
//! - Results only on completed jobs
//! - Callback registration rejected by the service
//! - Job deletion rules
//! - Optional query parameters and telemetry headers
//! - Polling until a terminal status
//! - Synchronous recognition, models and request timeouts

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use watson_sdk::WatsonError;
use watson_sdk::core::{NoAuthAuthenticator, ServiceOptions, shared};
use watson_sdk::speech_to_text::{
    CreateJobOptions, JobEvent, JobOutcome, JobStatus, PollOptions, RecognitionParams,
    RecognizeOptions, RegisterCallbackOptions, RegistrationState, SpeechToTextV1,
};

const CALLBACK_URL: &str = "https://results.example.com/stt";

fn client(server: &MockServer) -> SpeechToTextV1 {
    SpeechToTextV1::new(ServiceOptions::new(server.uri(), shared(NoAuthAuthenticator)))
        .expect("client should build")
}

fn audio() -> Vec<u8> {
    vec![0x52; 4096]
}

fn job_json(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "status": status,
        "created": "2026-03-01T10:00:00.000Z",
        "updated": "2026-03-01T10:00:05.000Z"
    })
}

fn completed_job_json(id: &str) -> serde_json::Value {
    let mut job = job_json(id, "completed");
    job["results"] = json!([{
        "result_index": 0,
        "results": [{
            "final": true,
            "alternatives": [{"transcript": "thunderstorms could produce large hail ", "confidence": 0.96}]
        }]
    }]);
    job
}

/// Log output of the poll loop, shown for failing tests.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

async fn received_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}

// =============================================================================
// Validation before I/O
// =============================================================================

#[tokio::test]
async fn test_missing_parameters_fail_before_io() {
    let server = MockServer::start().await;
    let stt = client(&server);

    let err = stt.create_job(CreateJobOptions::new(Vec::new())).await.unwrap_err();
    assert!(matches!(err, WatsonError::MissingParameter(ref name) if name == "audio"));

    let err = stt.check_job("").await.unwrap_err();
    assert!(err.is_validation());

    let err = stt.delete_job("").await.unwrap_err();
    assert!(err.is_validation());

    let err = stt
        .register_callback(RegisterCallbackOptions::new(""))
        .await
        .unwrap_err();
    assert!(matches!(err, WatsonError::MissingParameter(_)));

    let err = stt.delete_user_data("").await.unwrap_err();
    assert!(err.is_validation());

    assert_eq!(received_count(&server).await, 0);
}

#[tokio::test]
async fn test_invalid_options_fail_before_io() {
    let server = MockServer::start().await;
    let stt = client(&server);

    // events without a callback URL
    let err = stt
        .create_job(CreateJobOptions::new(audio()).with_events([JobEvent::Started]))
        .await
        .unwrap_err();
    assert!(matches!(err, WatsonError::InvalidParameter { .. }));

    // both customization ids
    #[allow(deprecated)]
    let params = RecognitionParams::default()
        .with_language_customization_id("lm-1")
        .with_customization_id("lm-2");
    let err = stt
        .create_job(CreateJobOptions::new(audio()).with_params(params))
        .await
        .unwrap_err();
    assert!(matches!(err, WatsonError::InvalidParameter { .. }));

    // callback URL the service could never reach
    let err = stt
        .register_callback(RegisterCallbackOptions::new("http://localhost:9000/cb"))
        .await
        .unwrap_err();
    assert!(matches!(err, WatsonError::InvalidParameter { .. }));

    assert_eq!(received_count(&server).await, 0);
}

// =============================================================================
// Job status and results
// =============================================================================

#[tokio::test]
async fn test_check_job_results_only_when_completed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/recognitions/job-done"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completed_job_json("job-done")))
        .mount(&server)
        .await;

    for (id, status) in [("job-wait", "waiting"), ("job-busy", "processing")] {
        Mock::given(method("GET"))
            .and(path(format!("/v1/recognitions/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_json(id, status)))
            .mount(&server)
            .await;
    }

    let mut failed = job_json("job-failed", "failed");
    failed["warnings"] = json!(["unable to transcode data stream audio/wav -> audio/x-float-array"]);
    Mock::given(method("GET"))
        .and(path("/v1/recognitions/job-failed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(failed))
        .mount(&server)
        .await;

    let stt = client(&server);

    let done = stt.check_job("job-done").await.unwrap().into_result();
    assert_eq!(done.status, JobStatus::Completed);
    let results = done.results().expect("completed job has results");
    assert_eq!(results[0].transcript(), "thunderstorms could produce large hail");

    for id in ["job-wait", "job-busy"] {
        let job = stt.check_job(id).await.unwrap().into_result();
        assert!(job.results().is_none());
        assert!(matches!(job.outcome(), JobOutcome::Pending(_)));
    }

    let job = stt.check_job("job-failed").await.unwrap().into_result();
    assert!(job.results().is_none());
    match job.outcome() {
        JobOutcome::Failed(warnings) => assert_eq!(warnings.len(), 1),
        other => panic!("expected failed outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn test_check_jobs_lists_recognitions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/recognitions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "recognitions": [job_json("a", "waiting"), job_json("b", "completed")]
        })))
        .mount(&server)
        .await;

    let jobs = client(&server).check_jobs().await.unwrap().into_result();
    let ids: Vec<_> = jobs.recognitions.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
}

// =============================================================================
// Callback registration
// =============================================================================

#[tokio::test]
async fn test_register_callback_created_and_existing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/register_callback"))
        .and(query_param("callback_url", CALLBACK_URL))
        .and(query_param("user_secret", "ThisIsMySecret"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"status": "created", "url": CALLBACK_URL})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/register_callback"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "already created", "url": CALLBACK_URL})),
        )
        .mount(&server)
        .await;

    let stt = client(&server);

    let first = stt
        .register_callback(RegisterCallbackOptions::new(CALLBACK_URL).with_user_secret("ThisIsMySecret"))
        .await
        .unwrap();
    assert_eq!(first.status_code, 201);
    assert_eq!(first.result.status, RegistrationState::Created);

    let second = stt
        .register_callback(RegisterCallbackOptions::new(CALLBACK_URL))
        .await
        .unwrap();
    assert_eq!(second.status_code, 200);
    assert_eq!(second.result.status, RegistrationState::AlreadyCreated);
}

#[tokio::test]
async fn test_register_callback_rejected_by_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/register_callback"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("X-Global-Transaction-Id", "txn-register-1")
                .set_body_json(json!({
                    "code": 400,
                    "error": "unable to verify callback url https://results.example.com/stt, server responded with status code: 404"
                })),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .register_callback(RegisterCallbackOptions::new(CALLBACK_URL))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(400));
    let service_error = err.service_error().expect("service error");
    assert!(service_error.message.contains("unable to verify callback url"));
    assert_eq!(service_error.transaction_id.as_deref(), Some("txn-register-1"));
}

// =============================================================================
// Job creation
// =============================================================================

#[tokio::test]
async fn test_create_job_sends_callback_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/recognitions"))
        .and(query_param("callback_url", CALLBACK_URL))
        .and(query_param("events", "recognitions.started,recognitions.completed_with_results"))
        .and(query_param("user_token", "batch-7"))
        .and(query_param("results_ttl", "60"))
        .and(query_param("model", "en-US_NarrowbandModel"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "job-new",
            "status": "waiting",
            "created": "2026-03-01T10:00:00.000Z",
            "url": "https://stream.example.com/speech-to-text/api/v1/recognitions/job-new",
            "user_token": "batch-7"
        })))
        .mount(&server)
        .await;

    let job = client(&server)
        .create_job(
            CreateJobOptions::new(audio())
                .with_content_type("audio/flac")
                .with_callback_url(CALLBACK_URL)
                .with_events([JobEvent::Started, JobEvent::CompletedWithResults])
                .with_user_token("batch-7")
                .with_results_ttl(60)
                .with_params(RecognitionParams::default().with_model("en-US_NarrowbandModel")),
        )
        .await
        .unwrap();

    assert_eq!(job.status_code, 201);
    assert_eq!(job.result.status, JobStatus::Waiting);
    assert_eq!(job.result.user_token.as_deref(), Some("batch-7"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].headers.get("content-type").unwrap().to_str().unwrap(),
        "audio/flac"
    );
    assert_eq!(requests[0].body.len(), 4096);
}

#[tokio::test]
async fn test_omitted_results_ttl_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/recognitions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(job_json("job-ttl", "waiting")))
        .mount(&server)
        .await;

    client(&server)
        .create_job(CreateJobOptions::new(audio()))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(
        requests[0]
            .url
            .query_pairs()
            .all(|(name, _)| name != "results_ttl")
    );
    assert_eq!(
        requests[0].headers.get("content-type").unwrap().to_str().unwrap(),
        "application/octet-stream"
    );
}

#[tokio::test]
async fn test_requests_carry_telemetry_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/recognitions/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("job-1", "processing")))
        .mount(&server)
        .await;

    client(&server).check_job("job-1").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let headers = &requests[0].headers;
    assert_eq!(
        headers.get("X-IBMCloud-SDK-Analytics").unwrap().to_str().unwrap(),
        "service_name=speech_to_text;service_version=V1;operation_id=CheckJob"
    );
    assert!(
        headers
            .get("User-Agent")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("watson-apis-rust-sdk-")
    );
}

// =============================================================================
// Deletion
// =============================================================================

#[tokio::test]
async fn test_delete_processing_job_rejected_completed_deleted() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/recognitions/job-busy"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "error": "Unable to delete a job in processing state"
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/recognitions/job-done"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/recognitions/job-done"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": 404,
            "error": "job not found"
        })))
        .mount(&server)
        .await;

    let stt = client(&server);

    let err = stt.delete_job("job-busy").await.unwrap_err();
    assert_eq!(err.status_code(), Some(400));

    let deleted = stt.delete_job("job-done").await.unwrap();
    assert_eq!(deleted.status_code, 204);

    let err = stt.check_job("job-done").await.unwrap_err();
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(err.service_error().unwrap().message, "job not found");
}

// =============================================================================
// Polling
// =============================================================================

#[tokio::test]
async fn test_wait_for_job_polls_until_completed() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/recognitions/job-poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("job-poll", "waiting")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/recognitions/job-poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("job-poll", "processing")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/recognitions/job-poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completed_job_json("job-poll")))
        .mount(&server)
        .await;

    let job = client(&server)
        .wait_for_job(
            "job-poll",
            PollOptions::default()
                .with_interval(Duration::from_millis(10))
                .with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.results().is_some());
    assert_eq!(received_count(&server).await, 4);
}

#[tokio::test]
async fn test_wait_for_job_times_out() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/recognitions/job-slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("job-slow", "processing")))
        .mount(&server)
        .await;

    let err = client(&server)
        .wait_for_job(
            "job-slow",
            PollOptions::default()
                .with_interval(Duration::from_millis(20))
                .with_timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WatsonError::Timeout(_)));
}

#[tokio::test]
async fn test_wait_for_job_stops_on_service_error() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/recognitions/job-gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"code": 404, "error": "job not found"})))
        .mount(&server)
        .await;

    let err = client(&server)
        .wait_for_job("job-gone", PollOptions::default().with_interval(Duration::from_millis(10)))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
    assert_eq!(received_count(&server).await, 1);
}

// =============================================================================
// Synchronous recognition and models
// =============================================================================

#[tokio::test]
async fn test_recognize_sends_raw_audio_and_params() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .and(query_param("model", "en-US_NarrowbandModel"))
        .and(query_param("keywords", "hail,tornado"))
        .and(query_param("keywords_threshold", "0.5"))
        .and(query_param("timestamps", "true"))
        .and(header("Content-Type", "audio/flac"))
        .and(body_bytes(audio()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_index": 0,
            "results": [{
                "final": true,
                "alternatives": [{"transcript": "large hail is possible ", "confidence": 0.9}]
            }],
            "warnings": ["Unknown arguments: foo."]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = client(&server)
        .recognize(
            RecognizeOptions::new(audio())
                .with_content_type("audio/flac")
                .with_params(
                    RecognitionParams::default()
                        .with_model("en-US_NarrowbandModel")
                        .with_keywords(["hail", "tornado"])
                        .with_keywords_threshold(0.5)
                        .with_timestamps(true),
                ),
        )
        .await
        .unwrap()
        .into_result();

    assert_eq!(results.transcript(), "large hail is possible");
    assert_eq!(results.warnings.len(), 1);
}

#[tokio::test]
async fn test_recognize_rejects_short_audio_before_io() {
    let server = MockServer::start().await;
    let stt = client(&server);

    let err = stt
        .recognize(RecognizeOptions::new(vec![0u8; 10]))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = stt
        .recognize(
            RecognizeOptions::new(audio())
                .with_params(RecognitionParams::default().with_customization_weight(2.0)),
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());

    assert_eq!(received_count(&server).await, 0);
}

#[tokio::test]
async fn test_get_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models/en-US_BroadbandModel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "en-US_BroadbandModel",
            "language": "en-US",
            "rate": 16000,
            "url": "https://stream.example.com/v1/models/en-US_BroadbandModel",
            "supported_features": {"custom_language_model": true, "speaker_labels": true},
            "description": "US English broadband model."
        })))
        .mount(&server)
        .await;

    let model = client(&server)
        .get_model("en-US_BroadbandModel")
        .await
        .unwrap()
        .into_result();
    assert_eq!(model.rate, 16000);
    assert!(model.supported_features.custom_language_model);
    assert!(!model.supported_features.custom_acoustic_model);

    let err = client(&server).get_model("").await.unwrap_err();
    assert!(matches!(err, WatsonError::MissingParameter(_)));
}

#[tokio::test]
async fn test_unregister_callback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/unregister_callback"))
        .and(query_param("callback_url", CALLBACK_URL))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let stt = client(&server);
    let response = stt.unregister_callback(CALLBACK_URL).await.unwrap();
    assert_eq!(response.status_code, 200);

    let err = stt.unregister_callback("").await.unwrap_err();
    assert!(matches!(err, WatsonError::MissingParameter(_)));
}

#[tokio::test]
async fn test_request_timeout_is_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/recognitions/job-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(job_json("job-1", "processing"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let stt = SpeechToTextV1::new(
        ServiceOptions::new(server.uri(), shared(NoAuthAuthenticator))
            .with_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let err = stt.check_job("job-1").await.unwrap_err();
    assert!(matches!(err, WatsonError::Timeout(_)), "got {err:?}");
}
