//! End-to-end HTTP tests: the real router and store driven with one-shot
//! requests against a scripted in-process RESP backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tower::ServiceExt;

use jkv_client::DocumentStore;
use jkv_common::config::StoreSettings;
use jkv_server::{router, AppState};

// ---------------------------------------------------------------------------
// Scripted RESP backend
// ---------------------------------------------------------------------------

enum Action {
    Reply(Vec<u8>),
    Stall(Duration, Vec<u8>),
}

type Script = Arc<dyn Fn(&[Vec<u8>]) -> Action + Send + Sync>;

struct Backend {
    addr: String,
    accepted: Arc<AtomicUsize>,
}

impl Backend {
    fn settings(&self) -> StoreSettings {
        let (host, port) = self.addr.rsplit_once(':').expect("addr");
        StoreSettings {
            host: host.to_string(),
            port: port.parse().expect("port"),
            ..StoreSettings::default()
        }
    }
}

async fn spawn_backend(script: Script) -> Backend {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    let accepted = Arc::new(AtomicUsize::new(0));

    let backend = Backend {
        addr,
        accepted: accepted.clone(),
    };

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => break,
            };
            accepted.fetch_add(1, Ordering::SeqCst);
            let script = script.clone();
            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut reader = BufReader::new(read_half);
                while let Ok(Some(args)) = read_command(&mut reader).await {
                    match script(&args) {
                        Action::Reply(bytes) => {
                            if write_half.write_all(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Action::Stall(delay, bytes) => {
                            tokio::time::sleep(delay).await;
                            if write_half.write_all(&bytes).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    backend
}

async fn read_command(
    reader: &mut BufReader<OwnedReadHalf>,
) -> std::io::Result<Option<Vec<Vec<u8>>>> {
    let mut line = Vec::new();
    if !read_line(reader, &mut line).await? {
        return Ok(None);
    }
    assert_eq!(line.first(), Some(&b'*'), "expected array header");
    let count: usize = std::str::from_utf8(&line[1..]).unwrap().parse().unwrap();

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        assert!(read_line(reader, &mut line).await?, "eof inside command");
        let len: usize = std::str::from_utf8(&line[1..]).unwrap().parse().unwrap();
        let mut data = vec![0u8; len + 2];
        reader.read_exact(&mut data).await?;
        data.truncate(len);
        args.push(data);
    }
    Ok(Some(args))
}

async fn read_line(
    reader: &mut BufReader<OwnedReadHalf>,
    buf: &mut Vec<u8>,
) -> std::io::Result<bool> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf).await?;
    if bytes == 0 {
        return Ok(false);
    }
    buf.truncate(buf.len().saturating_sub(2));
    Ok(true)
}

fn simple(text: &str) -> Vec<u8> {
    format!("+{text}\r\n").into_bytes()
}

fn integer(value: i64) -> Vec<u8> {
    format!(":{value}\r\n").into_bytes()
}

fn bulk(data: &[u8]) -> Vec<u8> {
    let mut out = format!("${}\r\n", data.len()).into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out
}

fn nil() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

fn err(text: &str) -> Vec<u8> {
    format!("-{text}\r\n").into_bytes()
}

fn scan_reply(cursor: &str, keys: &[&str]) -> Vec<u8> {
    let mut out = b"*2\r\n".to_vec();
    out.extend_from_slice(&bulk(cursor.as_bytes()));
    out.extend_from_slice(format!("*{}\r\n", keys.len()).as_bytes());
    for key in keys {
        out.extend_from_slice(&bulk(key.as_bytes()));
    }
    out
}

fn command_name(args: &[Vec<u8>]) -> String {
    String::from_utf8_lossy(&args[0]).to_ascii_uppercase()
}

fn arg(args: &[Vec<u8>], idx: usize) -> String {
    String::from_utf8_lossy(&args[idx]).to_string()
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn app_for(backend: &Backend, request_timeout: Duration) -> Router {
    let store = DocumentStore::new(&backend.settings());
    router(AppState::new(store, request_timeout))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body: Value = serde_json::from_slice(&bytes).expect("json body");
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("encode")))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn set_returns_the_ok_envelope() {
    let backend = spawn_backend(Arc::new(|_args| Action::Reply(simple("OK")))).await;
    let app = app_for(&backend, Duration::from_secs(2));

    let (status, body) = send(
        &app,
        post_json("/v1/cache", json!({"key": "user:1", "value": {"n": 1}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["code"], 200);
    assert_eq!(body["message"], "Key successfully set");
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let backend = spawn_backend(Arc::new(|_args| Action::Reply(simple("OK")))).await;
    let app = app_for(&backend, Duration::from_secs(2));

    let request = Request::builder()
        .method("POST")
        .uri("/v1/cache")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failure");
    assert_eq!(body["message"], "Bad Request");
    assert_eq!(backend.accepted.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_key_is_a_bad_request() {
    let backend = spawn_backend(Arc::new(|_args| Action::Reply(simple("OK")))).await;
    let app = app_for(&backend, Duration::from_secs(2));

    let (status, body) = send(
        &app,
        post_json("/v1/cache", json!({"key": "   ", "value": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Bad Request");
}

#[tokio::test]
async fn get_reports_hits_and_misses_in_the_envelope() {
    let backend = spawn_backend(Arc::new(|args| match command_name(args).as_str() {
        "JSON.GET" if arg(args, 1) == "present" => Action::Reply(bulk(b"{\"n\":5}")),
        "JSON.GET" => Action::Reply(nil()),
        _ => Action::Reply(simple("PONG")),
    }))
    .await;
    let app = app_for(&backend, Duration::from_secs(2));

    let (status, body) = send(&app, get("/v1/cache/present")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Key available");
    assert_eq!(body["payload"], json!({"n": 5}));

    let (status, body) = send(&app, get("/v1/cache/absent")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Key unavailable.");
    assert!(body.get("payload").is_none());
}

#[tokio::test]
async fn delete_reports_missing_and_removed() {
    let backend = spawn_backend(Arc::new(|args| match command_name(args).as_str() {
        "JSON.DEL" if arg(args, 1) == "present" => Action::Reply(integer(1)),
        "JSON.DEL" => Action::Reply(integer(0)),
        _ => Action::Reply(simple("PONG")),
    }))
    .await;
    let app = app_for(&backend, Duration::from_secs(2));

    let (status, body) = send(&app, delete("/v1/cache/present")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Key Deleted");

    let (status, body) = send(&app, delete("/v1/cache/absent")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Key unavailable.");
}

#[tokio::test]
async fn bare_wildcard_pattern_is_forbidden() {
    let backend = spawn_backend(Arc::new(|_args| Action::Reply(simple("OK")))).await;
    let app = app_for(&backend, Duration::from_secs(2));

    let (status, body) = send(&app, delete("/v1/cache/pattern/*")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], "failure");
    assert_eq!(body["message"], "Operation not allowed.");
    assert_eq!(backend.accepted.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pattern_delete_reports_the_confirmed_count() {
    let backend = spawn_backend(Arc::new(|args| match command_name(args).as_str() {
        "SCAN" => Action::Reply(scan_reply("0", &["user:1", "user:2"])),
        "UNLINK" => Action::Reply(integer(1)),
        _ => Action::Reply(simple("PONG")),
    }))
    .await;
    let app = app_for(&backend, Duration::from_secs(2));

    let (status, body) = send(&app, delete("/v1/cache/pattern/user:*")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Key Deleted");
    assert_eq!(body["payload"], 2);
}

#[tokio::test]
async fn pattern_delete_with_no_matches_reports_keys_unavailable() {
    let backend = spawn_backend(Arc::new(|args| match command_name(args).as_str() {
        "SCAN" => Action::Reply(scan_reply("0", &[])),
        _ => Action::Reply(simple("PONG")),
    }))
    .await;
    let app = app_for(&backend, Duration::from_secs(2));

    let (status, body) = send(&app, delete("/v1/cache/pattern/user:*")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Keys unavailable.");
}

#[tokio::test]
async fn stalled_store_yields_the_timeout_envelope() {
    let backend = spawn_backend(Arc::new(|_args| {
        Action::Stall(Duration::from_millis(300), nil())
    }))
    .await;
    let app = app_for(&backend, Duration::from_millis(50));

    let (status, body) = send(&app, get("/v1/cache/slow")).await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["status"], "failure");
    assert_eq!(body["code"], 408);
    assert_eq!(body["message"], "Request Timeout.");
}

#[tokio::test]
async fn store_failures_collapse_to_internal_error() {
    let backend =
        spawn_backend(Arc::new(|_args| Action::Reply(err("ERR store on fire")))).await;
    let app = app_for(&backend, Duration::from_secs(2));

    let (status, body) = send(&app, get("/v1/cache/any")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "failure");
    assert_eq!(body["message"], "Internal Server Error");
}
