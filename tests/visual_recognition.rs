//! Visual Recognition V3 operations against a mocked service.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use watson_sdk::WatsonError;
use watson_sdk::core::{BearerTokenAuthenticator, ServiceOptions, shared};
use watson_sdk::visual_recognition::{
    ClassifierExamples, ClassifierStatus, ClassifyOptions, VisualRecognitionV3,
};

const VERSION: &str = "2018-03-19";

fn client(server: &MockServer) -> VisualRecognitionV3 {
    let auth = BearerTokenAuthenticator::new("test-token").expect("token");
    VisualRecognitionV3::new(VERSION, ServiceOptions::new(server.uri(), shared(auth)))
        .expect("client should build")
}

fn zip(marker: u8) -> Vec<u8> {
    vec![0x50, 0x4b, 0x03, 0x04, marker]
}

#[tokio::test]
async fn test_classify_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/classify"))
        .and(query_param("version", VERSION))
        .and(header("Accept-Language", "es"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "images_processed": 1,
            "custom_classes": 0,
            "images": [{
                "source_url": "https://example.com/fruitbowl.jpg",
                "resolved_url": "https://example.com/fruitbowl.jpg",
                "classifiers": [{
                    "classifier_id": "default",
                    "name": "default",
                    "classes": [
                        {"class": "manzana", "score": 0.645},
                        {"class": "fruta", "score": 0.788}
                    ]
                }]
            }]
        })))
        .mount(&server)
        .await;

    let images = client(&server)
        .classify(
            ClassifyOptions::from_url("https://example.com/fruitbowl.jpg")
                .with_threshold(0.6)
                .with_owners(["IBM"])
                .with_accept_language("es"),
        )
        .await
        .unwrap()
        .into_result();

    assert_eq!(images.images_processed, Some(1));
    assert_eq!(images.top_class().unwrap().class, "fruta");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"url\""));
    assert!(body.contains("name=\"threshold\""));
    assert!(body.contains("name=\"owners\""));
    assert!(!body.contains("name=\"images_file\""));
}

#[tokio::test]
async fn test_classify_requires_image_or_url() {
    let server = MockServer::start().await;
    let err = client(&server)
        .classify(ClassifyOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WatsonError::MissingParameter(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_classifier_needs_two_example_sets() {
    let server = MockServer::start().await;
    let vr = client(&server);

    let err = vr
        .create_classifier(
            "dogs",
            ClassifierExamples::default().with_positive("beagle", zip(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WatsonError::InvalidParameter { .. }));

    let err = vr
        .create_classifier("dogs", ClassifierExamples::default().with_negative(zip(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, WatsonError::MissingParameter(_)));

    let err = vr
        .create_classifier(
            "",
            ClassifierExamples::default()
                .with_positive("beagle", zip(1))
                .with_positive("husky", zip(2)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WatsonError::MissingParameter(_)));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_classifier_multipart_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/classifiers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "classifier_id": "dogs_1941945966",
            "name": "dogs",
            "owner": "a3a48ea7-492b-448b-87d7-9dade8bde5a9",
            "status": "training",
            "created": "2026-03-01T10:00:00.000Z",
            "classes": [{"class": "beagle"}]
        })))
        .mount(&server)
        .await;

    let classifier = client(&server)
        .create_classifier(
            "dogs",
            ClassifierExamples::default()
                .with_positive("beagle", zip(1))
                .with_negative(zip(2)),
        )
        .await
        .unwrap()
        .into_result();

    assert_eq!(classifier.status, Some(ClassifierStatus::Training));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"name\""));
    assert!(body.contains("name=\"beagle_positive_examples\"; filename=\"beagle.zip\""));
    assert!(body.contains("name=\"negative_examples\""));
}

#[tokio::test]
async fn test_update_classifier_needs_examples() {
    let server = MockServer::start().await;
    let err = client(&server)
        .update_classifier("dogs_1941945966", ClassifierExamples::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WatsonError::MissingParameter(_)));
}

#[tokio::test]
async fn test_list_classifiers_verbose() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/classifiers"))
        .and(query_param("verbose", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "classifiers": [
                {"classifier_id": "dogs_1", "name": "dogs", "status": "ready", "core_ml_enabled": true},
                {"classifier_id": "cats_2", "name": "cats", "status": "failed", "explanation": "too few images"}
            ]
        })))
        .mount(&server)
        .await;

    let list = client(&server)
        .list_classifiers(Some(true))
        .await
        .unwrap()
        .into_result();
    assert_eq!(list.classifiers.len(), 2);
    assert_eq!(list.classifiers[1].status, Some(ClassifierStatus::Failed));
    assert_eq!(list.classifiers[1].explanation.as_deref(), Some("too few images"));
}

#[tokio::test]
async fn test_get_core_ml_model_returns_bytes() {
    let server = MockServer::start().await;
    let model = vec![0xde, 0xad, 0xbe, 0xef];
    Mock::given(method("GET"))
        .and(path("/v3/classifiers/dogs_1/core_ml_model"))
        .and(header("Accept", "application/octet-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/octet-stream")
                .set_body_bytes(model.clone()),
        )
        .mount(&server)
        .await;

    let response = client(&server).get_core_ml_model("dogs_1").await.unwrap();
    assert_eq!(response.result.as_ref(), model.as_slice());
}

#[tokio::test]
async fn test_delete_classifier_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v3/classifiers/missing_1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "description": "Cannot delete classifier", "error_id": "not_found", "message": "Classifier not found"}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .delete_classifier("missing_1")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(err.service_error().unwrap().message, "Classifier not found");
}
