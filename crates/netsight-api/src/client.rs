// Async client for the device inventory GraphQL backend.
//
// Queries and mutations are POSTed as `{ query, operationName, variables }`
// to a single endpoint; live feeds go over a WebSocket (see
// `subscription`). Auth: `x-api-key` header.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::backend::{DeviceBackend, Subscription, SubscriptionKind};
use crate::error::Error;
use crate::queries;
use crate::subscription::{FeedParams, ReconnectConfig, spawn_feed};
use crate::transport::TransportConfig;
use crate::types::{
    CreateDeviceData, CreateDeviceVariables, DevicePage, DeviceRecord, GraphQlRequest,
    GraphQlResponse, ListDevicesData, ListDevicesVariables,
};

// ── Client ───────────────────────────────────────────────────────────

/// GraphQL client for listing, creating, and following devices.
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: Url,
    realtime_endpoint: Url,
    api_key: Option<SecretString>,
    reconnect: ReconnectConfig,
    timeout_secs: u64,
}

impl GraphqlClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from endpoints and a transport config.
    ///
    /// When `realtime_endpoint` is `None` it is derived from `endpoint`
    /// by switching the scheme to `ws`/`wss`.
    pub fn new(
        endpoint: &str,
        realtime_endpoint: Option<&str>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let mut client = Self::from_reqwest(endpoint, realtime_endpoint, http)?;
        client.api_key.clone_from(&transport.api_key);
        client.timeout_secs = transport.timeout_secs();
        Ok(client)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(
        endpoint: &str,
        realtime_endpoint: Option<&str>,
        http: reqwest::Client,
    ) -> Result<Self, Error> {
        let endpoint = Url::parse(endpoint)?;
        let realtime_endpoint = match realtime_endpoint {
            Some(raw) => Url::parse(raw)?,
            None => derive_realtime_url(&endpoint)?,
        };

        Ok(Self {
            http,
            endpoint,
            realtime_endpoint,
            api_key: None,
            reconnect: ReconnectConfig::default(),
            timeout_secs: TransportConfig::default().timeout_secs(),
        })
    }

    /// Override the subscription reconnect policy.
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn realtime_endpoint(&self) -> &Url {
        &self.realtime_endpoint
    }

    // ── GraphQL execution ────────────────────────────────────────────

    async fn execute<V, T>(
        &self,
        operation: &'static str,
        query: &str,
        variables: V,
    ) -> Result<T, Error>
    where
        V: Serialize + Send + Sync,
        T: DeserializeOwned,
    {
        debug!(operation, "POST {}", self.endpoint);

        let body = GraphQlRequest {
            query,
            operation_name: operation,
            variables,
        };

        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        self.handle_response(operation, resp).await
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(e)
        }
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: format!("{operation} rejected with HTTP {}", status.as_u16()),
            });
        }

        let body = resp.text().await.map_err(|e| self.map_send_error(e))?;

        // GraphQL servers often report errors with a non-2xx status and a
        // normal `{ errors }` body; prefer the structured form when present.
        let parsed = serde_json::from_str::<GraphQlResponse<T>>(&body);

        match parsed {
            Ok(envelope) if !envelope.errors.is_empty() => {
                let error_type = envelope.errors.iter().find_map(|e| e.error_type.clone());
                if is_auth_error_type(error_type.as_deref()) {
                    return Err(Error::Authentication {
                        message: envelope.errors[0].message.clone(),
                    });
                }
                Err(Error::GraphQl {
                    messages: envelope.errors.into_iter().map(|e| e.message).collect(),
                    error_type,
                })
            }
            Ok(envelope) if status.is_success() => {
                envelope.data.ok_or(Error::EmptyResponse { operation })
            }
            Ok(_) => Err(http_error(status, &body)),
            Err(_) if !status.is_success() => Err(http_error(status, &body)),
            Err(e) => {
                let preview: String = body.chars().take(200).collect();
                Err(Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                })
            }
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Fetch one page of devices.
    pub async fn list_devices(
        &self,
        limit: u32,
        next_token: Option<&str>,
    ) -> Result<DevicePage, Error> {
        let data: ListDevicesData = self
            .execute(
                queries::LIST_DEVICES_OPERATION,
                &queries::list_devices(),
                ListDevicesVariables { limit, next_token },
            )
            .await?;

        data.list_devices.ok_or(Error::EmptyResponse {
            operation: queries::LIST_DEVICES_OPERATION,
        })
    }

    /// Create one device.
    pub async fn create_device(&self, input: &DeviceRecord) -> Result<DeviceRecord, Error> {
        let data: CreateDeviceData = self
            .execute(
                queries::CREATE_DEVICE_OPERATION,
                &queries::create_device(),
                CreateDeviceVariables { input },
            )
            .await?;

        data.create_device.ok_or(Error::EmptyResponse {
            operation: queries::CREATE_DEVICE_OPERATION,
        })
    }

    /// Open a live feed of the given kind.
    pub fn subscribe(&self, kind: SubscriptionKind, cancel: &CancellationToken) -> Subscription {
        spawn_feed(
            FeedParams {
                url: self.realtime_endpoint.clone(),
                kind,
                api_key: self.api_key.clone(),
                reconnect: self.reconnect.clone(),
            },
            cancel,
        )
    }
}

#[async_trait]
impl DeviceBackend for GraphqlClient {
    async fn list_devices(
        &self,
        limit: u32,
        next_token: Option<&str>,
    ) -> Result<DevicePage, Error> {
        GraphqlClient::list_devices(self, limit, next_token).await
    }

    async fn create_device(&self, input: &DeviceRecord) -> Result<DeviceRecord, Error> {
        GraphqlClient::create_device(self, input).await
    }

    async fn subscribe(
        &self,
        kind: SubscriptionKind,
        cancel: CancellationToken,
    ) -> Result<Subscription, Error> {
        Ok(GraphqlClient::subscribe(self, kind, &cancel))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn http_error(status: reqwest::StatusCode, body: &str) -> Error {
    Error::Http {
        status: status.as_u16(),
        message: if body.is_empty() {
            status.to_string()
        } else {
            body.chars().take(500).collect()
        },
    }
}

fn is_auth_error_type(error_type: Option<&str>) -> bool {
    matches!(
        error_type,
        Some("UnauthorizedException" | "Unauthorized" | "UNAUTHENTICATED")
    )
}

/// `https://host/graphql` → `wss://host/graphql`.
fn derive_realtime_url(endpoint: &Url) -> Result<Url, Error> {
    let scheme = match endpoint.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    let mut url = endpoint.clone();
    url.set_scheme(scheme)
        .map_err(|()| Error::WebSocketConnect(format!("cannot derive realtime URL from {endpoint}")))?;
    Ok(url)
}
