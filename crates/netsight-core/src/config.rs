// ── Runtime session configuration ──
//
// These types describe *how* to reach the device backend and how hard
// to sweep it. They carry credential data and tuning, but never touch
// disk. The CLI constructs a `SessionConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

pub use netsight_api::ReconnectConfig;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed development backends).
    DangerAcceptInvalid,
}

/// What the sweep does once the last page has been appended.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SweepMode {
    /// Pages are appended as they arrive; nothing is replaced afterwards.
    #[default]
    AppendOnly,
    /// Pages are appended, then the collection is replaced by the
    /// accumulated list. Live events that landed mid-sweep are dropped.
    AppendThenReplace,
}

/// Bounds and behaviour of one bulk sweep.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Requested page size (`limit`). Default: 1000.
    pub page_size: u32,
    /// Stop after this many pages even if a cursor is still returned.
    pub max_pages: u32,
    /// Wall-clock budget for the whole sweep. `None` = unbounded.
    pub budget: Option<Duration>,
    pub mode: SweepMode,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_pages: 10_000,
            budget: None,
            mode: SweepMode::default(),
        }
    }
}

/// Configuration for one backend session.
///
/// Built by the CLI, passed to `Session` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// GraphQL endpoint for queries and mutations.
    pub endpoint: Url,
    /// WebSocket endpoint for subscriptions. Derived from `endpoint`
    /// when unset.
    pub realtime_endpoint: Option<Url>,
    pub api_key: Option<SecretString>,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    pub sweep: SweepOptions,
    /// Open the create/update subscriptions on activation.
    pub live_feeds: bool,
    pub reconnect: ReconnectConfig,
    /// Shown in the report header.
    pub customer_name: Option<String>,
}

impl SessionConfig {
    /// Defaults for everything except the endpoint.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            realtime_endpoint: None,
            api_key: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            sweep: SweepOptions::default(),
            live_feeds: true,
            reconnect: ReconnectConfig::default(),
            customer_name: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn sweep_defaults() {
        let opts = SweepOptions::default();
        assert_eq!(opts.page_size, 1000);
        assert_eq!(opts.max_pages, 10_000);
        assert!(opts.budget.is_none());
        assert_eq!(opts.mode, SweepMode::AppendOnly);
    }

    #[test]
    fn sweep_mode_parses_kebab_case() {
        assert_eq!(
            "append-then-replace".parse::<SweepMode>().unwrap(),
            SweepMode::AppendThenReplace
        );
        assert_eq!(SweepMode::AppendOnly.to_string(), "append-only");
        assert!("replace".parse::<SweepMode>().is_err());
    }

    #[test]
    fn session_config_defaults() {
        let config = SessionConfig::new("https://api.example.com/graphql".parse().unwrap());
        assert!(config.live_feeds);
        assert!(config.realtime_endpoint.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
