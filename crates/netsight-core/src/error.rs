// ── Core error types ──
//
// User-facing errors from netsight-core. Consumers never see HTTP status
// codes or JSON parse failures directly; the `From<netsight_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Session is not active")]
    SessionInactive,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── Backend errors (wrapped, not exposed raw) ────────────────────
    /// The backend answered with a structured GraphQL error payload.
    #[error("Backend rejected the request: {}", messages.join("; "))]
    Rejected {
        messages: Vec<String>,
        error_type: Option<String>,
    },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Live feed error: {message}")]
    Feed { message: String },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` when the backend returned a structured error payload, as
    /// opposed to a transport-level failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<netsight_api::Error> for CoreError {
    fn from(err: netsight_api::Error) -> Self {
        use netsight_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::Http { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            ApiError::GraphQl {
                messages,
                error_type,
            } => CoreError::Rejected {
                messages,
                error_type,
            },
            ApiError::EmptyResponse { operation } => CoreError::Api {
                message: format!("empty response for {operation}"),
                status: None,
            },
            ApiError::WebSocketConnect(reason) => CoreError::Feed {
                message: format!("WebSocket connection failed: {reason}"),
            },
            ApiError::WebSocketClosed { code, reason } => CoreError::Feed {
                message: format!("WebSocket closed (code {code}): {reason}"),
            },
            ApiError::Protocol(message) => CoreError::Feed { message },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
