//! Live device feeds with auto-reconnect.
//!
//! Speaks the `graphql-transport-ws` subprotocol: `connection_init` →
//! `connection_ack` → `subscribe`, then one `next` frame per device
//! event. Each feed runs in its own task and pushes decoded
//! [`DeviceRecord`]s into the channel behind a [`Subscription`].
//! Dropped connections are retried with exponential backoff + jitter.

use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::backend::{Subscription, SubscriptionKind};
use crate::error::Error;
use crate::extract::extract_path;
use crate::queries;
use crate::transport::API_KEY_HEADER;
use crate::types::DeviceRecord;

/// WebSocket subprotocol negotiated on the upgrade request.
pub const SUBPROTOCOL: &str = "graphql-transport-ws";

const FEED_CHANNEL_CAPACITY: usize = 256;

/// How long the server has to acknowledge `connection_init`.
const ACK_TIMEOUT: Duration = Duration::from_secs(10);

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for feed reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── Feed spawning ────────────────────────────────────────────────────

/// Everything one feed task needs to (re)connect.
#[derive(Debug, Clone)]
pub struct FeedParams {
    pub url: Url,
    pub kind: SubscriptionKind,
    pub api_key: Option<SecretString>,
    pub reconnect: ReconnectConfig,
}

/// Spawn the feed task and return its receiving handle.
///
/// The feed stops when `cancel` fires or the handle is dropped. Dropping
/// the handle does not cancel `cancel` itself.
pub fn spawn_feed(params: FeedParams, cancel: &CancellationToken) -> Subscription {
    let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
    let feed_cancel = cancel.child_token();
    let kind = params.kind;

    let task_cancel = feed_cancel.clone();
    tokio::spawn(async move {
        ws_loop(params, tx, task_cancel).await;
    });

    Subscription::new(kind, rx, feed_cancel)
}

/// How a single connection ended without error.
#[derive(Debug, PartialEq, Eq)]
enum FeedEnd {
    /// Server closed or completed; connect again after `initial_delay`.
    Reconnect,
    /// Cancelled or the consumer went away.
    Stop,
}

// ── Background reconnection loop ─────────────────────────────────────

async fn ws_loop(params: FeedParams, tx: mpsc::Sender<DeviceRecord>, cancel: CancellationToken) {
    let mut attempt: u32 = 0;

    while !cancel.is_cancelled() {
        match connect_and_stream(&params, &tx, &cancel).await {
            Ok(FeedEnd::Stop) => break,
            Ok(FeedEnd::Reconnect) => {
                tracing::info!(feed = %params.kind, "Subscription ended cleanly, reconnecting");
                attempt = 0;
                if !pause(params.reconnect.initial_delay, &cancel).await {
                    break;
                }
            }
            Err(e) if e.is_auth() => {
                tracing::error!(feed = %params.kind, error = %e, "Subscription rejected, giving up");
                break;
            }
            Err(e) => {
                tracing::warn!(feed = %params.kind, error = %e, attempt, "Subscription error");

                if let Some(max) = params.reconnect.max_retries {
                    if attempt >= max {
                        tracing::error!(
                            feed = %params.kind,
                            max_retries = max,
                            "Subscription reconnection limit reached, giving up"
                        );
                        break;
                    }
                }

                let delay = calculate_backoff(attempt, &params.reconnect);
                tracing::info!(
                    feed = %params.kind,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                    "Waiting before reconnect"
                );

                if !pause(delay, &cancel).await {
                    break;
                }

                attempt = attempt.saturating_add(1);
            }
        }
    }

    tracing::debug!(feed = %params.kind, "Subscription loop exiting");
}

/// Sleep for `delay`. `false` when cancelled first.
async fn pause(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

// ── Single connection lifecycle ──────────────────────────────────────

async fn connect_and_stream(
    params: &FeedParams,
    tx: &mpsc::Sender<DeviceRecord>,
    cancel: &CancellationToken,
) -> Result<FeedEnd, Error> {
    tracing::info!(url = %params.url, feed = %params.kind, "Connecting subscription");

    let uri: tungstenite::http::Uri = params
        .url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri).with_sub_protocol(SUBPROTOCOL);
    if let Some(ref key) = params.api_key {
        request = request.with_header(API_KEY_HEADER, key.expose_secret());
    }

    let (ws_stream, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(FeedEnd::Stop),
        result = tokio_tungstenite::connect_async(request) => result.map_err(map_connect_error)?,
    };

    let (mut write, mut read) = ws_stream.split();
    send_json(&mut write, &connection_init(params.api_key.as_ref())).await?;

    let subscription_id = uuid::Uuid::new_v4().to_string();
    let document = queries::subscription(params.kind.field());
    let ack_deadline = tokio::time::sleep(ACK_TIMEOUT);
    tokio::pin!(ack_deadline);
    let mut acked = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                if acked {
                    let _ = send_json(&mut write, &complete_message(&subscription_id)).await;
                }
                let _ = write.close().await;
                return Ok(FeedEnd::Stop);
            }
            () = &mut ack_deadline, if !acked => {
                return Err(Error::Protocol(format!(
                    "no connection_ack within {}s",
                    ACK_TIMEOUT.as_secs()
                )));
            }
            frame = read.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(frame))) => return close_outcome(frame.as_ref()),
                    Some(Ok(Message::Ping(_))) => {
                        // transport-level pongs are sent by tungstenite
                        tracing::trace!("WebSocket ping");
                        continue;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                    None => {
                        tracing::info!(feed = %params.kind, "WebSocket stream ended");
                        return Ok(FeedEnd::Reconnect);
                    }
                };

                match parse_frame(&text) {
                    ServerFrame::ConnectionAck => {
                        acked = true;
                        send_json(&mut write, &subscribe_message(&subscription_id, &document)).await?;
                        tracing::info!(feed = %params.kind, id = %subscription_id, "Subscription started");
                    }
                    ServerFrame::Ping => send_json(&mut write, &json!({ "type": "pong" })).await?,
                    ServerFrame::Next { id, payload } => {
                        if id.as_deref().is_some_and(|id| id != subscription_id) {
                            tracing::debug!(?id, "Ignoring frame for another subscription");
                            continue;
                        }
                        if let Some(record) = decode_record(params.kind, &payload) {
                            if tx.send(record).await.is_err() {
                                return Ok(FeedEnd::Stop);
                            }
                        }
                    }
                    ServerFrame::Error(message) => return Err(Error::Protocol(message)),
                    ServerFrame::Complete => {
                        tracing::info!(feed = %params.kind, "Server completed subscription");
                        return Ok(FeedEnd::Reconnect);
                    }
                    ServerFrame::Pong | ServerFrame::Ignored => {}
                }
            }
        }
    }
}

fn map_connect_error(e: tungstenite::Error) -> Error {
    if let tungstenite::Error::Http(ref response) = e {
        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Error::Authentication {
                message: format!("subscription handshake rejected with HTTP {status}"),
            };
        }
    }
    Error::WebSocketConnect(e.to_string())
}

/// Normal closes reconnect immediately; protocol close codes (4400+)
/// go through backoff, and 4401/4403 stop the feed.
fn close_outcome(frame: Option<&tungstenite::protocol::CloseFrame>) -> Result<FeedEnd, Error> {
    let Some(cf) = frame else {
        tracing::info!("WebSocket close frame received (no payload)");
        return Ok(FeedEnd::Reconnect);
    };

    let code = u16::from(cf.code);
    tracing::info!(code, reason = %cf.reason, "WebSocket close frame received");

    match code {
        4401 | 4403 => Err(Error::Authentication {
            message: cf.reason.to_string(),
        }),
        4400.. => Err(Error::WebSocketClosed {
            code,
            reason: cf.reason.to_string(),
        }),
        _ => Ok(FeedEnd::Reconnect),
    }
}

async fn send_json<S>(sink: &mut S, value: &Value) -> Result<(), Error>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    sink.send(Message::text(value.to_string()))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))
}

// ── Protocol messages ────────────────────────────────────────────────

fn connection_init(api_key: Option<&SecretString>) -> Value {
    let payload = match api_key {
        Some(key) => json!({ API_KEY_HEADER: key.expose_secret() }),
        None => json!({}),
    };
    json!({ "type": "connection_init", "payload": payload })
}

fn subscribe_message(id: &str, document: &str) -> Value {
    json!({
        "id": id,
        "type": "subscribe",
        "payload": { "query": document, "variables": {} }
    })
}

fn complete_message(id: &str) -> Value {
    json!({ "id": id, "type": "complete" })
}

#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, PartialEq)]
enum ServerFrame {
    ConnectionAck,
    Ping,
    Pong,
    Next { id: Option<String>, payload: Value },
    Error(String),
    Complete,
    Ignored,
}

fn parse_frame(text: &str) -> ServerFrame {
    let frame: WireFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse subscription frame");
            return ServerFrame::Ignored;
        }
    };

    match frame.kind.as_str() {
        "connection_ack" => ServerFrame::ConnectionAck,
        "ping" => ServerFrame::Ping,
        "pong" => ServerFrame::Pong,
        "next" => ServerFrame::Next {
            id: frame.id,
            payload: frame.payload,
        },
        "error" => ServerFrame::Error(error_messages(&frame.payload)),
        "complete" => ServerFrame::Complete,
        other => {
            tracing::trace!(kind = other, "Ignoring subscription frame");
            ServerFrame::Ignored
        }
    }
}

/// `error` payloads are an array of GraphQL errors; tolerate a bare object.
fn error_messages(payload: &Value) -> String {
    let message_of = |v: &Value| v.get("message").and_then(Value::as_str).map(str::to_owned);
    let messages: Vec<String> = match payload {
        Value::Array(items) => items.iter().filter_map(message_of).collect(),
        other => message_of(other).into_iter().collect(),
    };
    if messages.is_empty() {
        payload.to_string()
    } else {
        messages.join("; ")
    }
}

/// Pull the device out of `payload.data.<field>`.
fn decode_record(kind: SubscriptionKind, payload: &Value) -> Option<DeviceRecord> {
    if let Some(errors) = payload.get("errors") {
        tracing::warn!(feed = %kind, %errors, "Subscription payload carried errors");
    }

    let value = match extract_path(&["data", kind.field()], payload) {
        Some(Value::Null) | None => {
            tracing::debug!(feed = %kind, "Subscription payload without device");
            return None;
        }
        Some(value) => value,
    };

    let Value::Object(object) = value else {
        tracing::warn!(feed = %kind, "Subscription device is not an object");
        return None;
    };

    match DeviceRecord::from_wire(object.clone()) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(feed = %kind, error = %e, "Could not deserialize subscription device");
            None
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 +- 0.25)`
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(31)).unwrap_or(31);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
