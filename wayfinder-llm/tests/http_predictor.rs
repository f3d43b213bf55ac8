//! End-to-end `HttpPredictor` tests against a hand-rolled TCP server —
//! there's no mock-HTTP crate in the dependency stack, so these speak raw
//! HTTP/1.1 directly, reading just enough of the request to know it's
//! complete before writing a canned response.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wayfinder_core::{is_error_output, Predictor};
use wayfinder_llm::HttpPredictor;

async fn spawn_responder(body: &'static str, delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}")
}

fn chat_completion_body(content: &str) -> String {
    let escaped = content.replace('\\', "\\\\").replace('"', "\\\"");
    format!(r#"{{"choices":[{{"message":{{"content":"{escaped}"}}}}]}}"#)
}

#[tokio::test]
async fn parses_well_formed_json_content() {
    let content = r#"{"overall_confidence": 0.9, "reasoning": "ok"}"#;
    let body: &'static str = Box::leak(chat_completion_body(content).into_boxed_str());
    let endpoint = spawn_responder(body, Duration::ZERO).await;

    let predictor = HttpPredictor::new(endpoint, "test-model");
    let out = predictor.predict("show me james smith", 0.1, Duration::from_secs(5)).await;
    assert!(!is_error_output(&out));
    assert_eq!(out["overall_confidence"], 0.9);
}

#[tokio::test]
async fn recovers_json_embedded_in_prose_via_brace_extraction() {
    let content = r#"Sure! {"overall_confidence": 0.7, "reasoning": "extracted"} hope that helps."#;
    let body: &'static str = Box::leak(chat_completion_body(content).into_boxed_str());
    let endpoint = spawn_responder(body, Duration::ZERO).await;

    let predictor = HttpPredictor::new(endpoint, "test-model");
    let out = predictor.predict("anything", 0.1, Duration::from_secs(5)).await;
    assert!(!is_error_output(&out));
    assert_eq!(out["reasoning"], "extracted");
}

#[tokio::test]
async fn unparseable_content_degrades_to_error_output() {
    let body: &'static str = Box::leak(chat_completion_body("not json at all, sorry").into_boxed_str());
    let endpoint = spawn_responder(body, Duration::ZERO).await;

    let predictor = HttpPredictor::new(endpoint, "test-model");
    let out = predictor.predict("anything", 0.1, Duration::from_secs(5)).await;
    assert!(is_error_output(&out));
}

#[tokio::test]
async fn deadline_shorter_than_server_delay_degrades_to_error_output() {
    let body: &'static str = Box::leak(chat_completion_body(r#"{"overall_confidence": 0.9}"#).into_boxed_str());
    let endpoint = spawn_responder(body, Duration::from_millis(300)).await;

    let predictor = HttpPredictor::new(endpoint, "test-model");
    let out = predictor.predict("anything", 0.1, Duration::from_millis(20)).await;
    assert!(is_error_output(&out));
}
