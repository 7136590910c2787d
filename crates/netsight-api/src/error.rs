use thiserror::Error;

/// Top-level error type for the `netsight-api` crate.
///
/// Covers every failure mode of the backend surfaces: HTTP transport,
/// GraphQL query/mutation responses, and the subscription WebSocket.
/// `netsight-core` maps these into user-facing errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// API key rejected by the backend (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success HTTP status without a GraphQL body.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // ── GraphQL ─────────────────────────────────────────────────────
    /// Structured `errors` array returned alongside (or instead of) `data`.
    #[error("GraphQL error: {}", messages.join("; "))]
    GraphQl {
        messages: Vec<String>,
        error_type: Option<String>,
    },

    /// The response carried neither `data` for the operation nor `errors`.
    #[error("Empty GraphQL response for {operation}")]
    EmptyResponse { operation: &'static str },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// The server violated the subscription protocol (bad ack, error frame).
    #[error("Subscription protocol error: {0}")]
    Protocol(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the backend returned a structured error payload
    /// rather than a plain transport failure.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::GraphQl { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the API key was rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Extract the GraphQL error type, if available.
    pub fn error_type(&self) -> Option<&str> {
        match self {
            Self::GraphQl { error_type, .. } => error_type.as_deref(),
            _ => None,
        }
    }
}
