//! RestTodoClient against a single-shot local HTTP responder.

use std::time::Duration;
use todoq_client::{RestTodoClient, TodoService};
use todoq_core::{ApiConfig, NewTodo, QueryKey, TodoError, TodoId, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

struct Captured {
    request_line: String,
    body: String,
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

async fn read_request(socket: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = header_end(&buf) {
            break end;
        }
    };
    let head = String::from_utf8_lossy(&buf[..end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending body");
        buf.extend_from_slice(&chunk[..n]);
    }
    Captured {
        request_line: head.lines().next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&buf[end..end + content_length]).to_string(),
    }
}

/// Answer exactly one request with `status` and `body`.
async fn respond_once(status: u16, body: &'static str) -> (String, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        let _ = tx.send(captured);
    });
    (format!("http://{addr}"), rx)
}

fn client(base_url: &str, timeout_ms: u64) -> RestTodoClient {
    RestTodoClient::new(&ApiConfig {
        base_url: base_url.to_string(),
        request_timeout_ms: timeout_ms,
    })
    .unwrap()
}

#[tokio::test]
async fn list_sends_window_and_decodes_in_order() {
    let (url, captured) = respond_once(
        200,
        r#"[{"userId":1,"id":11,"title":"a","completed":false},{"userId":1,"id":12,"title":"b","completed":true}]"#,
    )
    .await;

    let items = client(&url, 2_000)
        .list_todos(QueryKey::new(10, 5).unwrap())
        .await
        .unwrap();

    let captured = captured.await.unwrap();
    assert_eq!(captured.request_line, "GET /todos?_start=10&_limit=5 HTTP/1.1");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, TodoId::Real(11));
    assert_eq!(items[1].id, TodoId::Real(12));
    assert!(items[1].completed);
}

#[tokio::test]
async fn create_posts_owner_and_title() {
    let (url, captured) =
        respond_once(201, r#"{"userId":1,"title":"Buy milk","id":201}"#).await;

    let item = client(&url, 2_000)
        .create_todo(NewTodo::new(1, "Buy milk"))
        .await
        .unwrap();

    let captured = captured.await.unwrap();
    assert_eq!(captured.request_line, "POST /todos HTTP/1.1");
    let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(body, serde_json::json!({ "userId": 1, "title": "Buy milk" }));
    assert_eq!(item.id, TodoId::Real(201));
    assert!(!item.completed);
}

#[tokio::test]
async fn non_success_status_is_transport_error() {
    let (url, _captured) = respond_once(500, r#"{"message":"boom"}"#).await;

    let err = client(&url, 2_000)
        .list_todos(QueryKey::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        TodoError::Transport(TransportError::Status {
            status: 500,
            body: r#"{"message":"boom"}"#.to_string(),
        })
    );
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let (url, _captured) = respond_once(200, r#"{"not":"a list"}"#).await;

    let err = client(&url, 2_000)
        .list_todos(QueryKey::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TodoError::Decode(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(socket);
    });

    let err = client(&url, 100)
        .list_todos(QueryKey::default())
        .await
        .unwrap_err();

    assert!(
        matches!(err, TodoError::Transport(TransportError::Timeout { .. })),
        "unexpected error: {err:?}"
    );
}
