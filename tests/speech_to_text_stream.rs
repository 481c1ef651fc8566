//! Streaming recognition against a local WebSocket server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, accept_hdr_async};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

use watson_sdk::WatsonError;
use watson_sdk::core::{BearerTokenAuthenticator, ServiceOptions, shared};
use watson_sdk::speech_to_text::{
    RecognitionParams, RecognizeEvent, RecognizeStreamOptions, SpeechToTextV1,
};

const TOKEN: &str = "ws-test-token";

/// What the mock service saw during one session.
#[derive(Debug, Default)]
struct Session {
    uri: String,
    start: Value,
    audio_bytes: usize,
    got_close: bool,
}

/// Accept one connection and play the recognition protocol.
async fn spawn_service(reject_auth: bool) -> (String, tokio::task::JoinHandle<Session>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let seen_uri = Arc::new(Mutex::new(String::new()));
        let uri_slot = seen_uri.clone();

        let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            *uri_slot.lock().unwrap() = request.uri().to_string();
            let authorized = request
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some(format!("Bearer {TOKEN}").as_str());
            if reject_auth || !authorized {
                let mut error = ErrorResponse::new(Some("Unauthorized".to_string()));
                *error.status_mut() = http::StatusCode::UNAUTHORIZED;
                return Err(error);
            }
            Ok(response)
        };

        let mut session = Session::default();
        let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
            session.uri = seen_uri.lock().unwrap().clone();
            return session;
        };
        session.uri = seen_uri.lock().unwrap().clone();

        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(text) => {
                    let action: Value = serde_json::from_str(&text).unwrap();
                    match action["action"].as_str() {
                        Some("start") => {
                            session.start = action;
                            ws.send(Message::Text(r#"{"state": "listening"}"#.into()))
                                .await
                                .unwrap();
                        }
                        Some("stop") => {
                            let interim = json!({
                                "result_index": 0,
                                "results": [{"final": false, "alternatives": [{"transcript": "hello"}]}]
                            });
                            let final_result = json!({
                                "result_index": 0,
                                "results": [{
                                    "final": true,
                                    "alternatives": [{"transcript": "hello world ", "confidence": 0.91}]
                                }]
                            });
                            for payload in [interim, final_result] {
                                ws.send(Message::Text(payload.to_string().into()))
                                    .await
                                    .unwrap();
                            }
                            ws.send(Message::Text(r#"{"state": "listening"}"#.into()))
                                .await
                                .unwrap();
                        }
                        other => panic!("unexpected action {other:?}"),
                    }
                }
                Message::Binary(audio) => session.audio_bytes += audio.len(),
                Message::Close(_) => {
                    session.got_close = true;
                    break;
                }
                _ => {}
            }
        }
        session
    });

    (format!("http://{addr}/instances/abc"), handle)
}

fn client(url: &str) -> SpeechToTextV1 {
    let auth = BearerTokenAuthenticator::new(TOKEN).unwrap();
    SpeechToTextV1::new(ServiceOptions::new(url, shared(auth))).unwrap()
}

#[tokio::test]
async fn test_stream_audio_and_collect_results() {
    let (url, service) = spawn_service(false).await;

    let mut stream = client(&url)
        .recognize_using_websocket(
            RecognizeStreamOptions::new("audio/l16;rate=16000")
                .with_interim_results(true)
                .with_params(
                    RecognitionParams::default()
                        .with_model("en-US_BroadbandModel")
                        .with_timestamps(true),
                ),
        )
        .await
        .unwrap();

    assert!(matches!(
        stream.next_event().await,
        Some(RecognizeEvent::Listening)
    ));

    for chunk in [vec![0u8; 3200], vec![1u8; 3200], vec![2u8; 1600]] {
        stream.send_audio(Bytes::from(chunk)).await.unwrap();
    }

    let results = tokio::time::timeout(Duration::from_secs(5), stream.collect())
        .await
        .expect("stream should finish")
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].transcript(), "");
    assert_eq!(results[1].transcript(), "hello world");

    let session = service.await.unwrap();
    assert_eq!(session.audio_bytes, 8000);
    assert!(session.got_close);
    assert_eq!(
        session.uri,
        "/instances/abc/v1/recognize?model=en-US_BroadbandModel"
    );
    assert_eq!(session.start["content-type"], "audio/l16;rate=16000");
    assert_eq!(session.start["interim_results"], true);
    assert_eq!(session.start["timestamps"], true);
    assert!(session.start.get("model").is_none());
}

#[tokio::test]
async fn test_rejected_handshake_is_authentication_error() {
    let (url, service) = spawn_service(true).await;

    let err = client(&url)
        .recognize_using_websocket(RecognizeStreamOptions::new("audio/flac"))
        .await
        .unwrap_err();

    assert!(matches!(err, WatsonError::Authentication(_)));
    let session = service.await.unwrap();
    assert_eq!(session.uri, "/instances/abc/v1/recognize");
}

#[tokio::test]
async fn test_invalid_params_fail_before_connecting() {
    let err = client("http://127.0.0.1:9/instances/abc")
        .recognize_using_websocket(
            RecognizeStreamOptions::new("audio/flac")
                .with_params(RecognitionParams::default().with_max_alternatives(0)),
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

/// Answer `start` with `listening`, then stay silent while draining audio.
async fn spawn_silent_service() -> (String, tokio::task::JoinHandle<usize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut frames = 0;
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(text) if text.contains("\"start\"") => {
                    ws.send(Message::Text(r#"{"state": "listening"}"#.into()))
                        .await
                        .unwrap();
                }
                Message::Binary(_) => frames += 1,
                Message::Close(_) => break,
                _ => {}
            }
        }
        frames
    });

    (format!("http://{addr}"), handle)
}

#[tokio::test]
async fn test_idle_timeout_fires_while_audio_is_sent() {
    let (url, service) = spawn_silent_service().await;

    let mut stream = client(&url)
        .recognize_using_websocket(
            RecognizeStreamOptions::new("audio/l16;rate=16000")
                .with_idle_timeout(Duration::from_millis(300)),
        )
        .await
        .unwrap();

    let mut sent = 0;
    for _ in 0..15 {
        if stream.send_audio(Bytes::from(vec![0u8; 320])).await.is_err() {
            break;
        }
        sent += 1;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(sent < 15, "stream stayed open for {sent} audio chunks");

    let mut idle_error = false;
    let mut closed = false;
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_secs(2), stream.next_event()).await
    {
        match event {
            RecognizeEvent::Error(message) => idle_error |= message.contains("idle timeout"),
            RecognizeEvent::Closed => {
                closed = true;
                break;
            }
            _ => {}
        }
    }
    assert!(idle_error);
    assert!(closed);

    let frames = service.await.unwrap();
    assert!(frames >= 1);
}
