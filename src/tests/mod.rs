use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::model::ValidationResult;
use crate::output::{self, ResultsTable, Status};
use crate::service::{HttpValidationService, ServiceError, ServiceOptions, ValidationService};
use crate::session::{Notice, Outcome, Session};

#[derive(Debug)]
pub(crate) struct Captured {
    head: String,
    body: Vec<u8>,
}

impl Captured {
    pub(crate) fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }

    fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
    };
    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut captured = Captured {
        head,
        body: buf[head_end + 4..].to_vec(),
    };

    if let Some(len) = captured
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok())
    {
        while captured.body.len() < len {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            captured.body.extend_from_slice(&chunk[..n]);
        }
    } else if captured
        .header("transfer-encoding")
        .map(|v| v.eq_ignore_ascii_case("chunked"))
        .unwrap_or(false)
    {
        while find(&captured.body, b"0\r\n\r\n").is_none() {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            captured.body.extend_from_slice(&chunk[..n]);
        }
    }
    captured
}

/// Answers one request per canned response, in order, then stops.
pub(crate) async fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<Captured>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            seen.push(read_request(&mut stream).await);
            let reply = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        }
        seen
    });
    (base, handle)
}

fn session_for(base: &str) -> Session<HttpValidationService> {
    let service = HttpValidationService::new(&ServiceOptions {
        base_url: base.to_string(),
        timeout_seconds: 10,
        proxy: None,
    })
    .unwrap();
    Session::new(service)
}

#[tokio::test]
async fn pdf_upload_sends_repeated_files_field() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.pdf");
    let b = dir.path().join("b.pdf");
    std::fs::write(&a, b"%PDF-1.4 first").unwrap();
    std::fs::write(&b, b"%PDF-1.4 second").unwrap();

    let body = serde_json::json!({
        "summary": {"total_pdfs": 2, "valid": 1, "invalid": 1, "errors": ["bad total"]},
        "extracted_data": [{}, {}],
        "validation_results": [
            {"filename": "a.pdf", "valid": true},
            {"filename": "b.pdf", "valid": false, "error": "bad total"}
        ]
    })
    .to_string();
    let (base, server) = serve(vec![(200, body)]).await;
    let session = session_for(&base);

    let outcome = session.submit_pdfs(&[a, b]).await;
    assert!(matches!(outcome, Outcome::Rendered { shown: 2, total: 2 }));

    let seen = server.await.unwrap();
    assert_eq!(
        seen[0].request_line(),
        "POST /extract-and-validate-pdfs HTTP/1.1"
    );
    assert!(seen[0]
        .header("content-type")
        .unwrap()
        .starts_with("multipart/form-data"));
    let sent = seen[0].body_text();
    assert_eq!(sent.matches("name=\"files\"").count(), 2);
    assert!(sent.contains("filename=\"a.pdf\""));
    assert!(sent.contains("filename=\"b.pdf\""));
    assert!(sent.contains("%PDF-1.4 second"));
    assert!(sent.contains("application/pdf"));

    let rows = session.rows().await;
    assert_eq!(rows[0].id, "a.pdf");
    assert_eq!(rows[1].status, Status::Invalid);
    assert_eq!(rows[1].error, "bad total");
    assert!(session.last_response().await.unwrap()["summary"].is_object());
}

#[tokio::test]
async fn json_payload_is_sent_verbatim() {
    let body = serde_json::json!({
        "summary": {"total": 2, "valid": 1, "invalid": 1, "errors": ["due date before invoice date"]},
        "results": [
            {"invoice_id": 17, "valid": true},
            {"invoice_id": "INV-2", "valid": false, "error": "due date before invoice date"}
        ]
    })
    .to_string();
    let (base, server) = serve(vec![(200, body)]).await;
    let session = session_for(&base);

    let raw = r#"  [{"invoice_id": 17, "net_total": 100.0}, {"invoice_id": "INV-2"}]  "#;
    let outcome = session.submit_json(raw).await;
    assert!(outcome.is_rendered());

    let seen = server.await.unwrap();
    assert_eq!(seen[0].request_line(), "POST /validate-json HTTP/1.1");
    assert_eq!(
        seen[0].header("content-type").as_deref(),
        Some("application/json")
    );
    let sent: serde_json::Value = serde_json::from_slice(&seen[0].body).unwrap();
    let expected: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
    assert_eq!(sent, expected);

    let rows = session.rows().await;
    assert_eq!(rows[0].id, "17");
    assert_eq!(rows[1].id, "INV-2");
    assert_eq!(rows[1].status.label(), "INVALID");
}

#[tokio::test]
async fn second_batch_replaces_first() {
    let first = serde_json::json!({"results": [
        {"invoice_id": "1", "valid": true},
        {"invoice_id": "2", "valid": false, "error": "x"},
        {"invoice_id": "3", "valid": true}
    ]})
    .to_string();
    let second = serde_json::json!({"results": [
        {"invoice_id": "9", "valid": false, "error": "y"}
    ]})
    .to_string();
    let (base, server) = serve(vec![(200, first), (200, second)]).await;
    let session = session_for(&base);

    assert!(session.submit_json("[1]").await.is_rendered());
    assert_eq!(session.results().await.len(), 3);
    assert!(session.submit_json("[2]").await.is_rendered());

    let cached = session.results().await;
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].display_id(), "9");
    assert_eq!(session.summary().await.invalid, 1);
    assert_eq!(server.await.unwrap().len(), 2);
}

#[tokio::test]
async fn http_error_is_reported_and_cache_kept() {
    let ok = serde_json::json!({"results": [{"invoice_id": "1", "valid": true}]}).to_string();
    let (base, server) = serve(vec![
        (200, ok),
        (422, r#"{"detail": "bad payload"}"#.to_string()),
    ])
    .await;
    let session = session_for(&base);

    assert!(session.submit_json("[]").await.is_rendered());
    match session.submit_json("{}").await {
        Outcome::Failed(ServiceError::Status { status, body, .. }) => {
            assert_eq!(status, 422);
            assert!(body.contains("bad payload"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(session.results().await.len(), 1);
    server.await.unwrap();
}

#[tokio::test]
async fn unexpected_shape_is_a_decode_error() {
    let (base, server) = serve(vec![
        (200, r#"{"validation_results": []}"#.to_string()),
        (200, "<html>not json</html>".to_string()),
    ])
    .await;
    let session = session_for(&base);

    // the JSON endpoint answers under "results", not "validation_results"
    let outcome = session.submit_json("[]").await;
    assert!(matches!(outcome, Outcome::Failed(ServiceError::Decode { .. })));
    let outcome = session.submit_json("[]").await;
    assert!(matches!(outcome, Outcome::Failed(ServiceError::Decode { .. })));
    assert!(session.rows().await.is_empty());
    server.await.unwrap();
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let session = session_for(&base);
    let outcome = session.submit_json("[]").await;
    assert!(matches!(
        outcome,
        Outcome::Failed(ServiceError::Transport { .. })
    ));
}

#[tokio::test]
async fn input_guards_never_reach_the_network() {
    // nothing listens here; any request would fail as Transport
    let session = session_for("http://127.0.0.1:9");
    assert!(matches!(
        session.submit_pdfs(&[]).await,
        Outcome::Rejected(Notice::NoFilesSelected)
    ));
    assert!(matches!(
        session.submit_json("  ").await,
        Outcome::Rejected(Notice::EmptyJson)
    ));
    assert!(matches!(
        session.submit_json("{not json").await,
        Outcome::Rejected(Notice::InvalidJson)
    ));
}

#[tokio::test]
async fn health_endpoint() {
    let (base, server) = serve(vec![(200, r#"{"status": "ok"}"#.to_string())]).await;
    let session = session_for(&base);
    let health = session.service().health().await.unwrap();
    assert!(health.is_ok());
    let seen = server.await.unwrap();
    assert_eq!(seen[0].request_line(), "GET /health HTTP/1.1");
}

#[tokio::test]
async fn missing_file_fails_the_whole_upload() {
    let (base, _server) = serve(vec![]).await;
    let session = session_for(&base);
    let outcome = session
        .submit_pdfs(&[PathBuf::from("/no/such/invoice.pdf")])
        .await;
    assert!(matches!(
        outcome,
        Outcome::Failed(ServiceError::FileRead { .. })
    ));
}

#[test]
fn render_fidelity_for_mixed_sources() {
    let results = vec![
        ValidationResult {
            invoice_id: Some("INV1".to_string()),
            valid: true,
            ..Default::default()
        },
        ValidationResult {
            filename: Some("f.pdf".to_string()),
            valid: false,
            error: Some("bad total".to_string()),
            ..Default::default()
        },
    ];
    let mut table = ResultsTable::new();
    output::render(&mut table, &results);
    let cells: Vec<(&str, &str, &str)> = table
        .rows()
        .iter()
        .map(|r| (r.id.as_str(), r.status.label(), r.error.as_str()))
        .collect();
    assert_eq!(
        cells,
        vec![("INV1", "VALID", ""), ("f.pdf", "INVALID", "bad total")]
    );
}
