use gather_tiled::{AssetCacheStore, Fetcher, HttpFetcher, ImportError};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

/// Serves exactly one HTTP/1.1 response per scripted entry, then exits.
fn serve(responses: Vec<(u16, &'static str, Vec<u8>)>) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let base = format!("http://{}", listener.local_addr().expect("local addr"));
    let handle = thread::spawn(move || {
        let mut request_lines = Vec::new();
        for (status, reason, body) in responses {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut line = String::new();
            reader.read_line(&mut line).expect("request line");
            request_lines.push(line.trim_end().to_string());
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).expect("header") == 0 || header == "\r\n" {
                    break;
                }
            }
            let head = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nX-Asset: demo\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).expect("write head");
            stream.write_all(&body).expect("write body");
        }
        request_lines
    });
    (base, handle)
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::with_client(reqwest::blocking::Client::builder().no_proxy().build().expect("client"))
}

#[test]
fn http_fetcher_returns_status_headers_and_body() {
    let (base, server) = serve(vec![(200, "OK", b"\x89PNG rest".to_vec())]);
    let response = fetcher().get(&format!("{base}/tiles/a.png?v=1"), &[("apiKey", "k")]).expect("response");
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"\x89PNG rest");
    assert_eq!(response.headers.get("x-asset").map(String::as_str), Some("demo"));
    let lines = server.join().expect("server thread");
    assert_eq!(lines, vec!["GET /tiles/a.png?v=1 HTTP/1.1".to_string()]);
}

#[test]
fn cache_surfaces_http_errors_with_status_and_body() {
    let (base, server) = serve(vec![(403, "Forbidden", b"signature expired".to_vec())]);
    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = AssetCacheStore::load(dir.path(), "cache.json");
    let err = store.fetch(&mut fetcher(), &format!("{base}/private.png")).unwrap_err();
    match err {
        ImportError::Fetch { status, body, .. } => {
            assert_eq!(status, 403);
            assert_eq!(body, "signature expired");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(store.is_empty());
    server.join().expect("server thread");
}

#[test]
fn unreachable_host_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let err = fetcher().get(&format!("http://{addr}/x.png"), &[]).unwrap_err();
    assert!(matches!(err, ImportError::Transport { .. }), "got {err:?}");
}
