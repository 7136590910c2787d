#![allow(clippy::unwrap_used)]
// Loopback tests for the live device feeds: a minimal
// graphql-transport-ws server on 127.0.0.1 drives the real client.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_util::sync::CancellationToken;

use netsight_api::{GraphqlClient, ReconnectConfig, SubscriptionKind, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

/// Accept one connection, complete the handshake, then push `devices`
/// as `next` frames for whatever subscription the client opens.
async fn serve_once(listener: TcpListener, field: &'static str, devices: Vec<Value>) {
    let mut ws = accept(&listener).await;

    let init = next_json(&mut ws).await;
    assert_eq!(init["type"], "connection_init");
    assert_eq!(init["payload"]["x-api-key"], "da2-test-key");
    ws.send(Message::text(json!({ "type": "connection_ack" }).to_string()))
        .await
        .unwrap();

    let subscribe = next_json(&mut ws).await;
    assert_eq!(subscribe["type"], "subscribe");
    let query = subscribe["payload"]["query"].as_str().unwrap();
    assert!(query.contains(field), "query should select {field}: {query}");
    let id = subscribe["id"].as_str().unwrap().to_owned();

    // keepalive ping must be answered with pong
    ws.send(Message::text(json!({ "type": "ping" }).to_string())).await.unwrap();
    let pong = next_json(&mut ws).await;
    assert_eq!(pong["type"], "pong");

    for device in devices {
        let frame = json!({
            "id": id,
            "type": "next",
            "payload": { "data": { field: device } }
        });
        ws.send(Message::text(frame.to_string())).await.unwrap();
    }

    // hold the connection open until the client goes away
    while let Some(Ok(msg)) = ws.next().await {
        if msg.is_close() {
            break;
        }
    }
}

/// Accept one connection and answer the upgrade with the subprotocol.
async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    let callback = |req: &Request, mut resp: Response| -> Result<Response, ErrorResponse> {
        assert_eq!(
            req.headers().get("x-api-key").and_then(|v| v.to_str().ok()),
            Some("da2-test-key")
        );
        resp.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static("graphql-transport-ws"),
        );
        Ok(resp)
    };
    tokio_tungstenite::accept_hdr_async(stream, callback).await.unwrap()
}

async fn next_json<S>(ws: &mut S) -> Value
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            _ => continue,
        }
    }
}

async fn client_for(listener: &TcpListener) -> GraphqlClient {
    let addr = listener.local_addr().unwrap();
    let transport = TransportConfig {
        api_key: Some(SecretString::from("da2-test-key".to_string())),
        ..TransportConfig::default()
    };
    GraphqlClient::new(
        &format!("http://{addr}/graphql"),
        Some(&format!("ws://{addr}/graphql")),
        &transport,
    )
    .unwrap()
    .with_reconnect(ReconnectConfig {
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(200),
        max_retries: Some(2),
    })
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_update_feed_delivers_devices_in_order() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = client_for(&listener).await;

    let server = tokio::spawn(serve_once(
        listener,
        "onUpdateDevice",
        vec![
            json!({ "macAddress": "AA:01", "osType": "Linux" }),
            json!(null),
            json!({ "macAddress": "AA:02", "deviceCategory": "Camera" }),
        ],
    ));

    let cancel = CancellationToken::new();
    let mut feed = client.subscribe(SubscriptionKind::Updated, &cancel);
    assert_eq!(feed.kind(), SubscriptionKind::Updated);

    let first = tokio::time::timeout(Duration::from_secs(5), feed.next())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), feed.next())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.mac_address.as_deref(), Some("AA:01"));
    // the null payload in between is skipped
    assert_eq!(second.mac_address.as_deref(), Some("AA:02"));
    assert_eq!(second.device_category.as_deref(), Some("Camera"));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dropping_feed_does_not_cancel_parent() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = client_for(&listener).await;

    let server = tokio::spawn(serve_once(
        listener,
        "onCreateDevice",
        vec![json!({ "macAddress": "BB:01" })],
    ));

    let cancel = CancellationToken::new();
    let mut feed = client.subscribe(SubscriptionKind::Created, &cancel);
    let created = tokio::time::timeout(Duration::from_secs(5), feed.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.mac_address.as_deref(), Some("BB:01"));

    drop(feed);
    assert!(!cancel.is_cancelled());

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clean_close_waits_before_reconnecting() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = client_for(&listener)
        .await
        .with_reconnect(ReconnectConfig {
            initial_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(1),
            max_retries: Some(2),
        });

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let init = next_json(&mut ws).await;
        assert_eq!(init["type"], "connection_init");
        ws.close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "done".into(),
        }))
        .await
        .unwrap();
        let closed_at = Instant::now();

        let (_stream, _) = listener.accept().await.unwrap();
        Instant::now() - closed_at
    });

    let cancel = CancellationToken::new();
    let _feed = client.subscribe(SubscriptionKind::Created, &cancel);

    let gap = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert!(gap >= Duration::from_millis(250), "reconnected after {gap:?}");

    cancel.cancel();
}
