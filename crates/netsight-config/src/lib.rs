//! Shared configuration for the netsight CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `netsight_core::SessionConfig`. The CLI layers its
//! flag overrides on top of what this crate resolves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use netsight_core::{SessionConfig, SweepMode, SweepOptions, TlsVerification};

/// Keyring service name; entries are keyed `<profile>/api-key`.
pub const KEYRING_SERVICE: &str = "netsight";

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "NETSIGHT_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: `requested`, else `default_profile`,
    /// else `"default"`.
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| ConfigError::UnknownProfile {
            name: name.to_owned(),
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_page_size() -> u32 {
    SweepOptions::default().page_size
}
fn default_max_pages() -> u32 {
    SweepOptions::default().max_pages
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// GraphQL endpoint (e.g., "https://example.appsync-api.us-east-1.amazonaws.com/graphql").
    pub endpoint: String,

    /// Subscription endpoint; derived from `endpoint` when unset.
    pub realtime_endpoint: Option<String>,

    /// API key (plaintext; prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Shown in the report header.
    pub customer_name: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    pub page_size: Option<u32>,

    pub max_pages: Option<u32>,

    /// Wall-clock budget for the sweep, e.g. "2m" or "90s".
    pub sweep_budget: Option<String>,

    /// "append-only" or "append-then-replace".
    pub sweep_mode: Option<String>,

    /// Open the live feeds on activation (default true).
    pub live_feeds: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `NETSIGHT_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("io", "netsight", "netsight").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("netsight");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, merged with `NETSIGHT_` env vars
/// (`NETSIGHT_DEFAULTS__TIMEOUT=10`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NETSIGHT_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve an API key from the credential chain (no CLI flag step).
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store an API key in the system keyring for `profile_name`.
pub fn store_api_key(profile_name: &str, key: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(key)?;
    Ok(())
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
}

// ── Profile → SessionConfig ─────────────────────────────────────────

/// Build a `SessionConfig` from a profile and the global defaults.
///
/// A missing API key is not an error here: some deployments authorize
/// by other means, and the backend answers 401 if it needs one.
pub fn profile_to_session_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let endpoint = parse_url("endpoint", &profile.endpoint)?;
    let realtime_endpoint = profile
        .realtime_endpoint
        .as_deref()
        .map(|raw| parse_url("realtime_endpoint", raw))
        .transpose()?;

    let api_key = match resolve_api_key(profile, profile_name) {
        Ok(key) => Some(key),
        Err(ConfigError::NoCredentials { .. }) => None,
        Err(e) => return Err(e),
    };

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let budget = profile
        .sweep_budget
        .as_deref()
        .map(|raw| {
            humantime::parse_duration(raw).map_err(|e| ConfigError::Validation {
                field: "sweep_budget".into(),
                reason: e.to_string(),
            })
        })
        .transpose()?;

    let mode = profile
        .sweep_mode
        .as_deref()
        .map(|raw| {
            raw.parse::<SweepMode>().map_err(|_| ConfigError::Validation {
                field: "sweep_mode".into(),
                reason: format!("expected 'append-only' or 'append-then-replace', got '{raw}'"),
            })
        })
        .transpose()?
        .unwrap_or_default();

    let mut config = SessionConfig::new(endpoint);
    config.realtime_endpoint = realtime_endpoint;
    config.api_key = api_key;
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.sweep = SweepOptions {
        page_size: profile.page_size.unwrap_or(defaults.page_size),
        max_pages: profile.max_pages.unwrap_or(defaults.max_pages),
        budget,
        mode,
    };
    config.live_feeds = profile.live_feeds.unwrap_or(true);
    config.customer_name.clone_from(&profile.customer_name);
    Ok(config)
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"
default_profile = "prod"

[defaults]
timeout = 12
page_size = 250

[profiles.prod]
endpoint = "https://inventory.example.com/graphql"
api_key = "da2-plaintext"
customer_name = "Clarian"
sweep_budget = "90s"
sweep_mode = "append-then-replace"
live_feeds = false
"#;

    #[test]
    fn loads_profiles_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.profile_name(None), "prod");
        assert_eq!(config.defaults.timeout, 12);
        assert_eq!(config.defaults.output, "table");

        let profile = config.profile("prod").unwrap();
        assert_eq!(profile.customer_name.as_deref(), Some("Clarian"));
        assert!(config.profile("staging").is_err());
    }

    #[test]
    fn profile_translates_to_session_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = load_config_from(&path).unwrap();
        let profile = config.profile("prod").unwrap();

        let session = profile_to_session_config(profile, "prod-test-only", &config.defaults).unwrap();
        assert_eq!(session.endpoint.as_str(), "https://inventory.example.com/graphql");
        assert_eq!(session.timeout, Duration::from_secs(12));
        assert_eq!(session.sweep.page_size, 250);
        assert_eq!(session.sweep.budget, Some(Duration::from_secs(90)));
        assert_eq!(session.sweep.mode, SweepMode::AppendThenReplace);
        assert!(!session.live_feeds);
        assert_eq!(session.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn unset_env_var_falls_back_to_plaintext() {
        let profile = Profile {
            endpoint: "https://x.example.com/graphql".into(),
            api_key: Some("plain".into()),
            api_key_env: Some("NETSIGHT_TEST_KEY_THAT_IS_NEVER_SET".into()),
            ..Profile::default()
        };
        let key = resolve_api_key(&profile, "fallback-test-only").unwrap();
        assert_eq!(key.expose_secret(), "plain");

        let keyless = Profile::default();
        assert!(matches!(
            resolve_api_key(&keyless, "keyless-test-only"),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn bad_values_are_rejected() {
        let defaults = Defaults::default();
        let bad_url = Profile {
            endpoint: "not a url".into(),
            ..Profile::default()
        };
        assert!(matches!(
            profile_to_session_config(&bad_url, "t", &defaults),
            Err(ConfigError::Validation { field, .. }) if field == "endpoint"
        ));

        let bad_mode = Profile {
            endpoint: "https://x.example.com/graphql".into(),
            sweep_mode: Some("sideways".into()),
            ..Profile::default()
        };
        assert!(matches!(
            profile_to_session_config(&bad_mode, "t", &defaults),
            Err(ConfigError::Validation { field, .. }) if field == "sweep_mode"
        ));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                endpoint: "https://x.example.com/graphql".into(),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(
            loaded.profile("default").unwrap().endpoint,
            "https://x.example.com/graphql"
        );
    }
}
