// ── Filter predicates for device snapshots ──
//
// Used by the CLI to narrow a snapshot without re-querying the backend.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::format::is_unknown_sentinel;
use crate::model::Device;
use crate::store::Snapshot;

/// Filter predicate for device collections.
pub enum DeviceFilter {
    All,
    ByCategory(String),
    ByOsType(String),
    Iot,
    WithAlarms,
    /// Raw attribute equals `value` (string compare on the JSON text).
    Attribute {
        name: String,
        value: String,
    },
    Custom(Box<dyn Fn(&Device) -> bool + Send + Sync>),
}

impl DeviceFilter {
    pub fn matches(&self, device: &Device) -> bool {
        match self {
            Self::All => true,
            Self::ByCategory(c) => device.category.known().is_some_and(|v| v.eq_ignore_ascii_case(c)),
            Self::ByOsType(os) => device.os_type.known().is_some_and(|v| v.eq_ignore_ascii_case(os)),
            Self::Iot => device.is_iot(),
            Self::WithAlarms => device.has_alarms(),
            Self::Attribute { name, value } => device
                .attribute(name)
                .is_some_and(|raw| attribute_matches(raw, value)),
            Self::Custom(f) => f(device),
        }
    }

    /// Matching devices, in snapshot order.
    pub fn apply(&self, devices: &[Arc<Device>]) -> Snapshot {
        Arc::new(
            devices
                .iter()
                .filter(|d| self.matches(d))
                .cloned()
                .collect(),
        )
    }
}

impl std::fmt::Debug for DeviceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::ByCategory(c) => f.debug_tuple("ByCategory").field(c).finish(),
            Self::ByOsType(os) => f.debug_tuple("ByOsType").field(os).finish(),
            Self::Iot => f.write_str("Iot"),
            Self::WithAlarms => f.write_str("WithAlarms"),
            Self::Attribute { name, value } => f
                .debug_struct("Attribute")
                .field("name", name)
                .field("value", value)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn attribute_matches(raw: &Value, wanted: &str) -> bool {
    if is_unknown_sentinel(raw) {
        return wanted.eq_ignore_ascii_case("unknown");
    }
    match raw {
        Value::String(s) => s.eq_ignore_ascii_case(wanted),
        other => other.to_string() == wanted,
    }
}

/// Error from parsing a `key=value` filter expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid filter '{0}': expected key=value, iot, or alarms")]
pub struct ParseFilterError(pub String);

/// Parses the CLI `--filter` syntax.
///
/// `category=...`, `os=...`, `iot`, `alarms`, `all`, or any raw
/// attribute as `attributeName=value`.
impl FromStr for DeviceFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "all" => return Ok(Self::All),
            "iot" => return Ok(Self::Iot),
            "alarms" => return Ok(Self::WithAlarms),
            _ => {}
        }

        let Some((key, value)) = s.split_once('=') else {
            return Err(ParseFilterError(s.to_owned()));
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() {
            return Err(ParseFilterError(s.to_owned()));
        }

        Ok(match key {
            "category" => Self::ByCategory(value.to_owned()),
            "os" | "os_type" => Self::ByOsType(value.to_owned()),
            _ => Self::Attribute {
                name: key.to_owned(),
                value: value.to_owned(),
            },
        })
    }
}
