// Wire types for the device inventory GraphQL backend.
//
// Field names follow the backend's camelCase schema. Attributes whose
// type varies between records (numbers that may arrive as the
// "NOT_FOUND" string, epoch timestamps that may arrive as strings) are
// kept as raw `serde_json::Value` and interpreted by `netsight-core`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Device record ───────────────────────────────────────────────────

/// One device as sent by the backend.
///
/// Only the attributes the client interprets are named; every other
/// attribute lands in `extra` so nothing the backend sends is dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curr_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ip_update: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_descr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iot_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_count: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_score: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfg_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_mfg_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Value>,
    #[serde(rename = "_createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(rename = "_updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Value>,

    /// All remaining attributes the backend sends.
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// The object exactly as received, `null` attributes included.
    /// Empty for records built locally.
    #[serde(skip)]
    pub raw: Map<String, Value>,
}

impl DeviceRecord {
    /// Decode one wire object, keeping the received attributes in `raw`.
    pub fn from_wire(object: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut record: Self = serde_json::from_value(Value::Object(object.clone()))?;
        record.raw = object;
        Ok(record)
    }

    /// All attributes of the record: `raw` when it was received, the
    /// serialized fields otherwise.
    pub fn attributes(&self) -> Map<String, Value> {
        if !self.raw.is_empty() {
            return self.raw.clone();
        }
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn wire_records<'de, D>(deserializer: D) -> Result<Vec<DeviceRecord>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    null_as_empty::<D, Map<String, Value>>(deserializer)?
        .into_iter()
        .map(|object| DeviceRecord::from_wire(object).map_err(serde::de::Error::custom))
        .collect()
}

fn wire_record<'de, D>(deserializer: D) -> Result<Option<DeviceRecord>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Map<String, Value>>::deserialize(deserializer)?
        .map(DeviceRecord::from_wire)
        .transpose()
        .map_err(serde::de::Error::custom)
}

// ── Pagination ──────────────────────────────────────────────────────

/// One page of the bulk query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePage {
    #[serde(default, deserialize_with = "wire_records")]
    pub items: Vec<DeviceRecord>,
    #[serde(default)]
    pub next_token: Option<String>,
}

impl DevicePage {
    /// Continuation cursor. An empty token is treated as absent.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|t| !t.is_empty())
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ── GraphQL envelopes ───────────────────────────────────────────────

/// Request body for a query or mutation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest<'a, V> {
    pub query: &'a str,
    pub operation_name: &'a str,
    pub variables: V,
}

/// Response body: `{ data, errors }`.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<GraphQlError>,
}

/// One entry of the GraphQL `errors` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub path: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDevicesVariables<'a> {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDevicesData {
    #[serde(default)]
    pub list_devices: Option<DevicePage>,
}

#[derive(Debug, Serialize)]
pub struct CreateDeviceVariables<'a> {
    pub input: &'a DeviceRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceData {
    #[serde(default, deserialize_with = "wire_record")]
    pub create_device: Option<DeviceRecord>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_attributes_land_in_extra() {
        let record: DeviceRecord = serde_json::from_value(json!({
            "macAddress": "AC:CC:8E:0A:69:26",
            "osType": "NOT_FOUND",
            "alarmCount": 3,
            "behaviorState": "NORMAL",
            "dhcpHostname": null
        }))
        .unwrap();

        assert_eq!(record.mac_address.as_deref(), Some("AC:CC:8E:0A:69:26"));
        assert_eq!(record.os_type.as_deref(), Some("NOT_FOUND"));
        assert_eq!(record.alarm_count, Some(json!(3)));
        assert_eq!(record.extra["behaviorState"], "NORMAL");
        assert!(record.extra["dhcpHostname"].is_null());
    }

    #[test]
    fn page_items_keep_null_attributes() {
        let page: DevicePage = serde_json::from_value(json!({
            "items": [{ "macAddress": "AA:01", "fqdn": null, "osType": null }],
            "nextToken": null
        }))
        .unwrap();

        let record = &page.items[0];
        assert_eq!(record.fqdn, None);
        assert_eq!(record.raw.len(), 3);
        assert!(record.raw["fqdn"].is_null());
        assert!(record.attributes()["osType"].is_null());
    }

    #[test]
    fn local_records_serialize_their_attributes() {
        let record = DeviceRecord {
            mac_address: Some("AA:01".into()),
            ..DeviceRecord::default()
        };
        assert!(record.raw.is_empty());
        assert_eq!(record.attributes().len(), 1);
    }

    #[test]
    fn serialization_skips_absent_fields() {
        let record = DeviceRecord {
            mac_address: Some("aa:bb".into()),
            ..DeviceRecord::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({ "macAddress": "aa:bb" }));
    }

    #[test]
    fn page_with_null_items_is_empty() {
        let page: DevicePage =
            serde_json::from_value(json!({ "items": null, "nextToken": null })).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_cursor().is_none());
    }

    #[test]
    fn empty_next_token_means_done() {
        let page: DevicePage = serde_json::from_value(json!({ "items": [], "nextToken": "" })).unwrap();
        assert!(page.next_cursor().is_none());
    }

    #[test]
    fn list_variables_omit_missing_token() {
        let vars = ListDevicesVariables {
            limit: 1000,
            next_token: None,
        };
        assert_eq!(serde_json::to_value(&vars).unwrap(), json!({ "limit": 1000 }));
    }

    #[test]
    fn response_envelope_with_errors() {
        let resp: GraphQlResponse<ListDevicesData> = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "Unauthorized", "errorType": "UnauthorizedException" }]
        }))
        .unwrap();
        assert!(resp.data.is_none());
        assert_eq!(resp.errors.len(), 1);
        assert_eq!(resp.errors[0].error_type.as_deref(), Some("UnauthorizedException"));
    }
}
