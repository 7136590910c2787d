// ── Wire → domain conversion ──
//
// `DeviceRecord` (netsight-api) carries raw strings and JSON values;
// `Device` carries readings with the backend's sentinels already
// resolved to `Unknown`.

use chrono::{DateTime, Utc};
use serde_json::Value;

use netsight_api::DeviceRecord;

use crate::format::{is_sentinel_str, is_unknown_sentinel, parse_timestamp};
use crate::model::{Device, MacAddress, Reading};

impl From<DeviceRecord> for Device {
    fn from(record: DeviceRecord) -> Self {
        let attributes = record.attributes();

        let ip = text(record.curr_ip_address).or(text(record.ip_address));
        let manufacturer = text(record.long_mfg_name).or(text(record.mfg_name));

        Device {
            id: record.id,
            mac: text(record.mac_address).map(MacAddress::new),
            ip,
            last_ip_update: timestamp(record.last_ip_update.as_ref()),
            fqdn: text(record.fqdn),
            description: text(record.device_descr),
            device_type: text(record.device_type),
            category: text(record.device_category),
            os_type: text(record.os_type),
            os_family: text(record.os_family),
            os_version: text(record.os_version),
            manufacturer,
            model: text(record.model_name_no),
            serial: text(record.serial_no),
            subnet: text(record.subnet),
            vlan: text(record.vlan_name),
            iot_endpoint: text(record.iot_endpoint),
            alarm_count: count(record.alarm_count.as_ref()),
            classification_score: score(record.classification_score.as_ref()),
            risk_score: score(record.risk_score.as_ref()),
            first_seen: timestamp(record.first_seen.as_ref()),
            last_seen: timestamp(record.last_seen.as_ref()),
            customer_name: text(record.customer_name),
            site_guid: text(record.site_guid),
            tenant_guid: text(record.tenant_guid),
            tags: tags(record.tags.as_ref()),
            attributes,
        }
    }
}

fn text(raw: Option<String>) -> Reading<String> {
    match raw {
        Some(s) if !is_sentinel_str(&s) => Reading::Known(s),
        _ => Reading::Unknown,
    }
}

fn count(raw: Option<&Value>) -> Reading<u64> {
    match raw {
        Some(Value::Number(n)) => n.as_u64().into(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok().into(),
        _ => Reading::Unknown,
    }
}

fn score(raw: Option<&Value>) -> Reading<f64> {
    match raw {
        Some(Value::Number(n)) => n.as_f64().into(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().into(),
        _ => Reading::Unknown,
    }
}

fn timestamp(raw: Option<&Value>) -> Reading<DateTime<Utc>> {
    raw.and_then(parse_timestamp).into()
}

/// Tags arrive as a list or as one comma-separated string.
fn tags(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !is_unknown_sentinel(v))
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect(),
        Some(Value::String(s)) if !is_sentinel_str(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}
