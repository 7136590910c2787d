// ── Device domain type ──

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::mac::MacAddress;
use super::reading::Reading;
use crate::format::is_unknown_sentinel;

/// One networked device, as an immutable snapshot.
///
/// The typed fields cover the attributes the views use. `attributes`
/// keeps every attribute exactly as the backend sent it; serializing a
/// `Device` emits that map.
#[derive(Debug, Clone, Default)]
pub struct Device {
    pub id: Option<String>,
    pub mac: Reading<MacAddress>,
    /// Current IP (`currIpAddress`, falling back to `ipAddress`).
    pub ip: Reading<String>,
    pub last_ip_update: Reading<DateTime<Utc>>,
    pub fqdn: Reading<String>,
    pub description: Reading<String>,
    pub device_type: Reading<String>,
    pub category: Reading<String>,
    pub os_type: Reading<String>,
    pub os_family: Reading<String>,
    pub os_version: Reading<String>,
    /// Long manufacturer name, falling back to the short one.
    pub manufacturer: Reading<String>,
    pub model: Reading<String>,
    pub serial: Reading<String>,
    pub subnet: Reading<String>,
    pub vlan: Reading<String>,
    pub iot_endpoint: Reading<String>,
    pub alarm_count: Reading<u64>,
    pub classification_score: Reading<f64>,
    pub risk_score: Reading<f64>,
    pub first_seen: Reading<DateTime<Utc>>,
    pub last_seen: Reading<DateTime<Utc>>,
    pub customer_name: Reading<String>,
    pub site_guid: Reading<String>,
    pub tenant_guid: Reading<String>,
    pub tags: Vec<String>,
    pub attributes: Map<String, Value>,
}

/// How many of a device's attributes carry real values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Completeness {
    pub total: usize,
    pub unknown: usize,
    pub known: usize,
    /// `unknown / total`, 0.0 for a device without attributes.
    pub unknown_ratio: f64,
}

impl Device {
    /// Key used in routes and lists: the MAC when known, else the id.
    pub fn key(&self) -> Option<&str> {
        self.mac
            .known()
            .map(MacAddress::as_str)
            .or(self.id.as_deref())
    }

    /// Raw attribute by backend name (`"macAddress"`, `"vlan"`, ...).
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn is_iot(&self) -> bool {
        self.iot_endpoint.is_known()
    }

    pub fn has_alarms(&self) -> bool {
        self.alarm_count.known().is_some_and(|&n| n > 0)
    }

    pub fn completeness(&self) -> Completeness {
        let total = self.attributes.len();
        let unknown = self
            .attributes
            .values()
            .filter(|v| is_unknown_sentinel(v))
            .count();
        let unknown_ratio = if total == 0 {
            0.0
        } else {
            ratio(unknown, total)
        };
        Completeness {
            total,
            unknown,
            known: total - unknown,
            unknown_ratio,
        }
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn ratio(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64
}

impl Serialize for Device {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}
