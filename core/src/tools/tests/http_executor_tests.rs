use super::*;
use crate::events::tests::RecordingHost;
use crate::tools::executors::SendRequest;
use crate::tools::types::*;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one canned HTTP response and return the request line received.
async fn serve_once(status: &'static str, body: String) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/health", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let n = socket.read(&mut buf).await.unwrap();
        let request = String::from_utf8_lossy(&buf[..n]).to_string();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request.lines().next().unwrap_or_default().to_string()
    });
    (url, handle)
}

#[tokio::test]
async fn test_send_request_keeps_body_tail() {
    let body = format!("{}{}", "x".repeat(100), "y".repeat(50));
    let (url, server) = serve_once("200 OK", body).await;
    let mut host = RecordingHost::default();

    let (response, events) = drive(
        SendRequest::new(Duration::from_secs(5)).unwrap(),
        SendRequestRequest {
            method: "get".to_string(),
            url,
        },
        &mut host,
    )
    .await;

    let response = response.unwrap();
    assert_eq!(response.response_code, Some(200));
    assert_eq!(response.response_body.unwrap(), "y".repeat(50));
    assert!(response.error.is_none());
    assert_eq!(server.await.unwrap(), "GET /health HTTP/1.1");
    assert_eq!(
        message_texts(&events).last().unwrap(),
        "Received response with status code 200"
    );
}

#[tokio::test]
async fn test_send_request_reports_status_codes() {
    let (url, _server) = serve_once("503 Service Unavailable", "down".to_string()).await;
    let mut host = RecordingHost::default();

    let (response, _) = drive(
        SendRequest::new(Duration::from_secs(5)).unwrap(),
        SendRequestRequest {
            method: "POST".to_string(),
            url,
        },
        &mut host,
    )
    .await;

    let response = response.unwrap();
    assert_eq!(response.response_code, Some(503));
    assert_eq!(response.response_body.as_deref(), Some("down"));
}

#[tokio::test]
async fn test_send_request_connection_error_is_recoverable() {
    // Bind then drop to get a port nobody listens on.
    let port = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap().port();
    let mut host = RecordingHost::default();

    let (response, events) = drive(
        SendRequest::new(Duration::from_secs(5)).unwrap(),
        SendRequestRequest {
            method: "GET".to_string(),
            url: format!("http://127.0.0.1:{}/", port),
        },
        &mut host,
    )
    .await;

    let response = response.unwrap();
    assert!(response.response_code.is_none());
    assert!(response.error.is_some());
    assert_eq!(
        message_texts(&events).last().unwrap(),
        "Request could not be completed successfully."
    );
}

#[tokio::test]
async fn test_send_request_rejects_bad_method() {
    let mut host = RecordingHost::default();

    let (response, _) = drive(
        SendRequest::new(Duration::from_secs(5)).unwrap(),
        SendRequestRequest {
            method: "NOT A METHOD".to_string(),
            url: "http://127.0.0.1:1/".to_string(),
        },
        &mut host,
    )
    .await;

    assert!(response.unwrap().error.unwrap().contains("unsupported method"));
}
