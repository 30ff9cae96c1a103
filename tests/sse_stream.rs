//! End-to-end event stream tests.
//!
//! Runs the real server on a loopback listener and consumes the SSE stream
//! with a plain HTTP client, the way a browser EventSource would.

mod common;

use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::time::timeout;
use uuid::Uuid;

use common::{bearer, TestApp};

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

fn ada() -> Uuid {
    Uuid::from_u128(0xa)
}

fn bob() -> Uuid {
    Uuid::from_u128(0xb)
}

async fn spawn_server(app: &TestApp) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    let router = app.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

/// Read frames off the byte stream until a complete `data: ...\n\n` frame
/// is available, and return its JSON payload.
async fn next_frame(
    stream: &mut (impl futures_util::Stream<Item = reqwest::Result<bytes::Bytes>> + Unpin),
    buffer: &mut String,
) -> Value {
    loop {
        if let Some(end) = buffer.find("\n\n") {
            let frame = buffer[..end].to_string();
            buffer.drain(..end + 2);
            let payload = frame
                .strip_prefix("data: ")
                .unwrap_or_else(|| panic!("unexpected frame: {frame}"));
            return serde_json::from_str(payload).expect("frame payload is JSON");
        }
        let chunk = timeout(FRAME_TIMEOUT, stream.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("stream errored");
        buffer.push_str(std::str::from_utf8(&chunk).expect("utf8 frame"));
    }
}

#[tokio::test]
async fn stream_delivers_connected_then_messages_and_read_receipts() {
    let app = TestApp::new();
    app.seed_user(ada(), "ada").await;
    app.seed_user(bob(), "bob").await;
    let room = app.seed_direct_room(ada(), bob()).await;
    let base = spawn_server(&app).await;

    let client = reqwest::Client::new();

    // Bob opens the event stream.
    let response = client
        .get(format!("{base}/chat/events?roomId={room}"))
        .header("authorization", bearer(bob()))
        .send()
        .await
        .expect("open stream");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    // The connected frame arrives first, naming the room.
    let frame = next_frame(&mut stream, &mut buffer).await;
    assert_eq!(frame["type"], "connected");
    assert_eq!(frame["roomId"], room.to_string());

    // Ada sends a message; bob's stream carries it with the sender profile.
    let message: Value = client
        .post(format!("{base}/chat/messages"))
        .header("authorization", bearer(ada()))
        .json(&json!({ "room_id": room, "content": "hello over the wire" }))
        .send()
        .await
        .expect("send message")
        .json()
        .await
        .expect("message body");

    let frame = next_frame(&mut stream, &mut buffer).await;
    assert_eq!(frame["type"], "new_message");
    assert_eq!(frame["message"]["content"], "hello over the wire");
    assert_eq!(frame["message"]["sender"]["username"], "ada");

    // Bob marks read; the watermark advance comes back as a read receipt.
    client
        .post(format!("{base}/chat/messages/read"))
        .header("authorization", bearer(bob()))
        .json(&json!({ "room_id": room, "upto": message["created_at"] }))
        .send()
        .await
        .expect("mark read");

    let frame = next_frame(&mut stream, &mut buffer).await;
    assert_eq!(frame["type"], "participant_update");
    assert_eq!(frame["data"]["user_id"], bob().to_string());
    assert_eq!(frame["data"]["room_id"], room.to_string());
}

#[tokio::test]
async fn streams_are_scoped_to_their_room() {
    let app = TestApp::new();
    app.seed_user(ada(), "ada").await;
    app.seed_user(bob(), "bob").await;
    let room_ab = app.seed_direct_room(ada(), bob()).await;
    let carol = Uuid::from_u128(0xc);
    app.seed_user(carol, "carol").await;
    let room_ac = app.seed_direct_room(ada(), carol).await;
    let base = spawn_server(&app).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{base}/chat/events?roomId={room_ab}"))
        .header("authorization", bearer(bob()))
        .send()
        .await
        .expect("open stream");
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    let frame = next_frame(&mut stream, &mut buffer).await;
    assert_eq!(frame["type"], "connected");

    // Traffic in the other room must not surface here.
    client
        .post(format!("{base}/chat/messages"))
        .header("authorization", bearer(ada()))
        .json(&json!({ "room_id": room_ac, "content": "for carol" }))
        .send()
        .await
        .expect("send to other room");
    client
        .post(format!("{base}/chat/messages"))
        .header("authorization", bearer(ada()))
        .json(&json!({ "room_id": room_ab, "content": "for bob" }))
        .send()
        .await
        .expect("send to this room");

    let frame = next_frame(&mut stream, &mut buffer).await;
    assert_eq!(frame["type"], "new_message");
    assert_eq!(frame["message"]["content"], "for bob");
}
