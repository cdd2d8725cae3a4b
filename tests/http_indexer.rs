use image_indexer::{FileEntry, HttpIndexer, ImageCandidate, IndexError, Indexer};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Serve one request with the given status line and body, returning the
/// request line and the request body.
fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<(String, String)>) {
    serve_raw(format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    ))
}

/// Serve one request, answering with `response` verbatim
fn serve_raw(response: String) -> (String, JoinHandle<(String, String)>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }

        let mut request_body = vec![0u8; content_length];
        reader.read_exact(&mut request_body).unwrap();

        let mut stream = stream;
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();

        (
            request_line.trim_end().to_string(),
            String::from_utf8(request_body).unwrap(),
        )
    });

    (format!("http://{}/visualsearch/image", addr), handle)
}

fn candidate() -> ImageCandidate {
    ImageCandidate::new("/images", FileEntry::new("/images/a", "test.jpg"))
}

#[test]
fn posts_image_url_as_json() {
    let (endpoint, server) = serve_once("201 Created", r#"{"_id":"AV9xyz"}"#);
    let indexer = HttpIndexer::new(
        &endpoint,
        Some("http://nginx/data/"),
        Duration::from_secs(5),
    )
    .unwrap();

    indexer.submit(&candidate()).unwrap();

    let (request_line, body) = server.join().unwrap();
    assert_eq!(request_line, "POST /visualsearch/image HTTP/1.1");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["imageUrl"], "http://nginx/data/a/test.jpg");
}

#[test]
fn server_error_is_a_rejection() {
    let (endpoint, server) = serve_once(
        "500 Internal Server Error",
        r#"{"error":"Unable to write visualsearch.image processing result to elastic"}"#,
    );
    let indexer = HttpIndexer::new(&endpoint, None, Duration::from_secs(5)).unwrap();

    let err = indexer.submit(&candidate()).unwrap_err();
    server.join().unwrap();

    match err {
        IndexError::Rejected { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("elastic"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn truncated_success_body_is_a_transport_error() {
    let (endpoint, server) = serve_raw(
        "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 64\r\nConnection: close\r\n\r\n{\"_id\":"
            .to_string(),
    );
    let indexer = HttpIndexer::new(&endpoint, None, Duration::from_secs(5)).unwrap();

    let err = indexer.submit(&candidate()).unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, IndexError::Transport(_)), "unexpected error: {err:?}");
}

#[test]
fn unreachable_service_is_a_transport_error() {
    // Grab a free port, then close it so nothing listens there
    let addr = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let endpoint = format!("http://{}/visualsearch/image", addr);
    let indexer = HttpIndexer::new(&endpoint, None, Duration::from_secs(2)).unwrap();

    let err = indexer.submit(&candidate()).unwrap_err();
    assert!(matches!(err, IndexError::Transport(_)));
}
