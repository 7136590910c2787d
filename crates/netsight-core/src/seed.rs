// ── Device seeding ──
//
// Pushes one device record through the create mutation. Used to put a
// representative record into an empty backend.

use serde_json::{Map, Value, json};
use tracing::{debug, info};

use netsight_api::{DeviceBackend, DeviceRecord};

use crate::error::CoreError;
use crate::format::is_sentinel_str;

/// A representative network camera, as the backend's classifier
/// reports one.
pub fn sample_device() -> DeviceRecord {
    let s = |v: &str| Some(v.to_owned());

    let mut extra = Map::new();
    for (key, value) in [
        ("avVendor", "NOT_FOUND"),
        ("behaviorState", "NORMAL"),
        ("blacklistEnforceStatus", "ENFORCEMENT_DISABLED"),
        ("classificationProfileId", "3623"),
        ("classificationSource", "PROFILE_LIB"),
        ("classificationState", "Classified"),
        ("criticality", "LEVEL_99"),
        ("deviceStatusFlags", "b110000110000000000000000000000000"),
        ("deviceTypeImg", "images/generic-webcam.jpeg"),
        ("dhcpHostname", "NOT_FOUND"),
        ("dicomAETitle", "NOT_FOUND"),
        ("encMethod", "NOT_FOUND"),
        ("equipmentGuid", "2PME3JX8LP"),
        ("fwFlowBaselineEnforceStatus", "ENFORCEMENT_DISABLED"),
        ("knownVulnRiskState", "NORMAL"),
        ("logoKey", "axiscomm-fc446ccf"),
        ("osSource", "NOT_FOUND"),
        ("osSubFamily", "NOT_FOUND"),
        ("profileGuid", "Axis-M3004-Network Camera"),
        ("profileMfg", "Axis"),
        ("swFlowBaselineEnforceStatus", "ENFORCEMENT_DISABLED"),
        ("swVersion", "NOT_FOUND"),
        ("useState", "UNKNOWN"),
        ("whitelistStatus", "WHITELIST_DISABLED"),
    ] {
        extra.insert(key.to_owned(), Value::String(value.to_owned()));
    }

    DeviceRecord {
        mac_address: s("AC:CC:8E:0A:69:26"),
        curr_ip_address: s("10.10.10.10"),
        fqdn: s("axis-accc8e0a6926.chp.clarian.org"),
        device_category: s("Physical Security Devices"),
        device_descr: s("Network Camera"),
        device_type: s("Network Camera"),
        iot_endpoint: s("IOT_ENDPOINT"),
        mfg_name: s("AxisComm"),
        long_mfg_name: s("Axis Communications AB"),
        model_name_no: s("AXIS M3004 M3004"),
        serial_no: s("ACCC8E0A6926"),
        os_family: s("NOT_FOUND"),
        os_type: s("NOT_FOUND"),
        os_version: s("NOT_FOUND"),
        subnet: s("10.16.48.0/24"),
        vlan_name: s("Vlan-48"),
        site_guid: s("TNT-89CB1X98ASB1PXASG1O-DEFAULT"),
        tenant_guid: s("TNT-89CB1X98ASB1PXASG1O"),
        extra,
        ..DeviceRecord::default()
    }
}

/// Create `input` (or [`sample_device`]) on the backend.
///
/// Returns the mutation result as `{"data": {"createDevice": ...}}`.
/// A record without a usable MAC address is refused before any request.
pub async fn persist_device(
    backend: &dyn DeviceBackend,
    input: Option<DeviceRecord>,
) -> Result<Value, CoreError> {
    let record = input.unwrap_or_else(sample_device);

    let has_mac = record
        .mac_address
        .as_deref()
        .is_some_and(|m| !m.trim().is_empty() && !is_sentinel_str(m));
    if !has_mac {
        return Err(CoreError::ValidationFailed {
            message: "device record needs a macAddress".into(),
        });
    }

    debug!(mac = record.mac_address.as_deref().unwrap_or_default(), "creating device");
    let created = backend.create_device(&record).await?;
    info!(mac = created.mac_address.as_deref().unwrap_or("-"), "device created");

    let created = serde_json::to_value(created)
        .map_err(|e| CoreError::Internal(format!("created device not serializable: {e}")))?;
    Ok(json!({ "data": { "createDevice": created } }))
}
