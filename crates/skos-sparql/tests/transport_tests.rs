//! HTTP Transport Tests
//!
//! Runs the reqwest transport against a one-shot TCP stub speaking just
//! enough HTTP/1.1 to answer a single request.
//!
//! Author: hephaex@gmail.com

use skos_core::{QueryForm, RawResult, SkosError, Transport};
use skos_sparql::HttpTransport;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const SELECT: &str = "SELECT ?s WHERE { ?s ?p ?o }";
const CONSTRUCT: &str = "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }";

// =============================================================================
// Stub Endpoint
// =============================================================================

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Serve one response; the handle yields the raw request
async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: String,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        request
    });

    (format!("http://{addr}/sparql"), handle)
}

/// Accept one connection and never answer
async fn serve_silence() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
    });
    format!("http://{addr}/sparql")
}

fn reason(err: SkosError) -> String {
    match err {
        SkosError::QueryFailed { reason, .. } => reason,
        other => panic!("expected QueryFailed, got {other:?}"),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_select_posts_form_and_parses_json() {
    let body = r#"{
      "head": { "vars": ["s"] },
      "results": { "bindings": [
        { "s": { "type": "uri", "value": "http://www.skosmos.skos/test/ta116" } }
      ] }
    }"#;
    let (endpoint, handle) =
        serve_once("200 OK", "application/sparql-results+json", body.to_string()).await;

    let transport = HttpTransport::new().unwrap();
    let raw = transport
        .execute(&endpoint, SELECT, QueryForm::Select, Duration::from_secs(5))
        .await
        .unwrap();

    let table = raw.into_table().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(
        table.rows()[0].iri("s"),
        Some("http://www.skosmos.skos/test/ta116")
    );

    let request = handle.await.unwrap().to_ascii_lowercase();
    assert!(request.starts_with("post /sparql"));
    assert!(request.contains("accept: application/sparql-results+json"));
    assert!(request.contains("application/x-www-form-urlencoded"));
    assert!(request.contains("query=select"));
}

#[tokio::test]
async fn test_construct_negotiates_ntriples() {
    let body = "<http://ex/a> <http://www.w3.org/2004/02/skos/core#prefLabel> \"A\"@en .\n";
    let (endpoint, handle) = serve_once("200 OK", "application/n-triples", body.to_string()).await;

    let transport = HttpTransport::new().unwrap();
    let raw = transport
        .execute(&endpoint, CONSTRUCT, QueryForm::Construct, Duration::from_secs(5))
        .await
        .unwrap();

    match raw {
        RawResult::Graph(triples) => {
            assert_eq!(triples.len(), 1);
            assert_eq!(triples[0].object.lang(), Some("en"));
        }
        other => panic!("expected graph, got {other:?}"),
    }
    let request = handle.await.unwrap().to_ascii_lowercase();
    assert!(request.contains("accept: application/n-triples"));
}

#[tokio::test]
async fn test_error_status_is_query_failed() {
    let (endpoint, _handle) = serve_once(
        "500 Internal Server Error",
        "text/plain",
        "Lucene index unavailable".to_string(),
    )
    .await;

    let transport = HttpTransport::new().unwrap();
    let err = transport
        .execute(&endpoint, SELECT, QueryForm::Select, Duration::from_secs(5))
        .await
        .unwrap_err();

    let reason = reason(err);
    assert!(reason.contains("HTTP 500"));
    assert!(reason.contains("Lucene index unavailable"));
}

#[tokio::test]
async fn test_unparsable_body_is_query_failed() {
    let (endpoint, _handle) = serve_once(
        "200 OK",
        "application/sparql-results+json",
        "<html>not json</html>".to_string(),
    )
    .await;

    let transport = HttpTransport::new().unwrap();
    let err = transport
        .execute(&endpoint, SELECT, QueryForm::Select, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(reason(err).contains("invalid results JSON"));
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let endpoint = serve_silence().await;

    let transport = HttpTransport::new().unwrap();
    let err = transport
        .execute(&endpoint, SELECT, QueryForm::Select, Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(reason(err).contains("timed out"));
}
