// Integration tests for the HTTP transcription client
//
// These tests run the real client against a local TCP listener serving
// canned HTTP responses, verifying the multipart request shape and the
// error taxonomy: transport and status failures vs malformed payloads.

use anyhow::Result;
use scribestream::audio::{encode_wav, AudioFormat};
use scribestream::{HttpTranscriber, PipelineError, Transcribe};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn sample_audio() -> Vec<u8> {
    encode_wav(&vec![100i16; 1600], 16000, 1).expect("failed to encode fixture WAV")
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read one full HTTP request (headers plus Content-Length body).
async fn read_request(sock: &mut TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = match sock.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);

        if let Some(header_end) = find_subsequence(&data, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&data[..header_end]).to_string();
            let content_length = headers.lines().find_map(|line| {
                line.to_ascii_lowercase()
                    .strip_prefix("content-length:")
                    .and_then(|v| v.trim().parse::<usize>().ok())
            });
            match content_length {
                Some(len) if data.len() >= header_end + 4 + len => break,
                None => break,
                _ => {}
            }
        }
    }

    data
}

/// Serve exactly one request with the given status line and body, returning
/// the endpoint base URL and a handle resolving to the raw request bytes.
async fn spawn_one_shot_server(
    status_line: &'static str,
    body: String,
) -> Result<(String, tokio::task::JoinHandle<Vec<u8>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.expect("accept failed");
        let request = read_request(&mut sock).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        let _ = sock.write_all(response.as_bytes()).await;
        let _ = sock.shutdown().await;
        request
    });

    Ok((format!("http://{}", addr), handle))
}

fn transcriber(endpoint: &str) -> HttpTranscriber {
    HttpTranscriber::new(endpoint, "whisper-base", "test-token", Duration::from_secs(5))
        .expect("failed to build transcriber")
}

#[tokio::test]
async fn test_successful_transcription_extracts_text_field() -> Result<()> {
    let (endpoint, server) =
        spawn_one_shot_server("200 OK", r#"{"text": "hello world"}"#.to_string()).await?;

    let text = transcriber(&endpoint)
        .transcribe(sample_audio(), AudioFormat::Wav)
        .await?;
    assert_eq!(text, "hello world");

    // The request carries the bearer token and the model/file multipart
    // fields at the expected path.
    let request = String::from_utf8_lossy(&server.await?).to_string();
    assert!(request.starts_with("POST /audio/transcriptions HTTP/1.1"));
    assert!(request.contains("authorization: Bearer test-token")
        || request.contains("Authorization: Bearer test-token"));
    assert!(request.contains(r#"name="model""#));
    assert!(request.contains("whisper-base"));
    assert!(request.contains(r#"name="file""#));
    assert!(request.contains(r#"filename="audio.wav""#));
    assert!(request.contains("audio/wav"));

    Ok(())
}

#[tokio::test]
async fn test_http_500_is_a_request_error() -> Result<()> {
    let (endpoint, _server) = spawn_one_shot_server(
        "500 Internal Server Error",
        r#"{"error": "inference backend down"}"#.to_string(),
    )
    .await?;

    let result = transcriber(&endpoint)
        .transcribe(sample_audio(), AudioFormat::Wav)
        .await;

    match result {
        Err(PipelineError::TranscriptionRequest {
            status,
            timed_out,
            message,
        }) => {
            assert_eq!(status, Some(500));
            assert!(!timed_out);
            assert!(message.contains("inference backend down"));
        }
        other => panic!("expected TranscriptionRequest, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_unexpected_json_shape_is_a_response_error() -> Result<()> {
    let (endpoint, _server) =
        spawn_one_shot_server("200 OK", r#"{"unexpected": "shape"}"#.to_string()).await?;

    let result = transcriber(&endpoint)
        .transcribe(sample_audio(), AudioFormat::Wav)
        .await;

    match result {
        Err(PipelineError::TranscriptionResponse { message }) => {
            assert!(message.contains("text"), "message was: {}", message);
        }
        other => panic!("expected TranscriptionResponse, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_non_json_body_is_a_response_error() -> Result<()> {
    let (endpoint, _server) =
        spawn_one_shot_server("200 OK", "this is not json".to_string()).await?;

    let result = transcriber(&endpoint)
        .transcribe(sample_audio(), AudioFormat::Wav)
        .await;

    assert!(matches!(
        result,
        Err(PipelineError::TranscriptionResponse { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_request_error() -> Result<()> {
    // Bind to grab a free port, then drop the listener so connects are
    // refused.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = format!("http://{}", listener.local_addr()?);
    drop(listener);

    let result = transcriber(&endpoint)
        .transcribe(sample_audio(), AudioFormat::Wav)
        .await;

    match result {
        Err(PipelineError::TranscriptionRequest { status, .. }) => {
            assert_eq!(status, None);
        }
        other => panic!("expected TranscriptionRequest, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_bounded_wait_elapses_as_timeout() -> Result<()> {
    // Accept and read the request but never respond.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = format!("http://{}", listener.local_addr()?);

    tokio::spawn(async move {
        if let Ok((mut sock, _)) = listener.accept().await {
            let _ = read_request(&mut sock).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    });

    let transcriber = HttpTranscriber::new(
        &endpoint,
        "whisper-base",
        "test-token",
        Duration::from_millis(300),
    )?;

    let result = transcriber.transcribe(sample_audio(), AudioFormat::Wav).await;

    match result {
        Err(PipelineError::TranscriptionRequest { timed_out, .. }) => {
            assert!(timed_out);
        }
        other => panic!("expected timed-out TranscriptionRequest, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_empty_audio_rejected_before_any_network_access() {
    // Nothing is listening at this endpoint; the rejection must happen
    // before a connection is attempted.
    let transcriber = transcriber("http://127.0.0.1:9");

    let result = transcriber.transcribe(Vec::new(), AudioFormat::Wav).await;
    assert!(matches!(
        result,
        Err(PipelineError::InvalidConfiguration { .. })
    ));
}
