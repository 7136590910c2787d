// ── Device summary report ──

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::model::{Device, Reading};

/// Bucket for devices whose category or OS type is not known.
pub const UNKNOWN_BUCKET: &str = "unknown";

/// Summary of one device snapshot.
///
/// Counts are taken over the raw collection, so a device delivered both
/// by the sweep and by a live event is counted twice everywhere except
/// `distinct_macs`.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub customer_name: Option<String>,
    pub total_devices: usize,
    pub distinct_macs: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_os_type: BTreeMap<String, usize>,
    pub iot_endpoints: usize,
    pub devices_with_alarms: usize,
    pub total_alarms: u64,
    pub completeness: CompletenessSummary,
}

/// Attribute coverage across the snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletenessSummary {
    /// Mean of each device's unknown ratio; 0.0 for an empty snapshot.
    pub mean_unknown_ratio: f64,
    pub most_complete: Option<MostComplete>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MostComplete {
    pub key: String,
    pub known: usize,
    pub total: usize,
}

/// Build the report for `devices`.
pub fn build_report(devices: &[Arc<Device>], customer_name: Option<&str>) -> DeviceReport {
    let mut by_category = BTreeMap::new();
    let mut by_os_type = BTreeMap::new();
    let mut macs = HashSet::new();
    let mut iot_endpoints = 0;
    let mut devices_with_alarms = 0;
    let mut total_alarms: u64 = 0;

    for device in devices {
        *by_category.entry(bucket(&device.category)).or_insert(0) += 1;
        *by_os_type.entry(bucket(&device.os_type)).or_insert(0) += 1;
        if let Some(mac) = device.mac.known() {
            macs.insert(mac.clone());
        }
        if device.is_iot() {
            iot_endpoints += 1;
        }
        if device.has_alarms() {
            devices_with_alarms += 1;
        }
        total_alarms = total_alarms.saturating_add(device.alarm_count.known().copied().unwrap_or(0));
    }

    DeviceReport {
        customer_name: customer_name.map(str::to_owned).or_else(|| first_customer(devices)),
        total_devices: devices.len(),
        distinct_macs: macs.len(),
        by_category,
        by_os_type,
        iot_endpoints,
        devices_with_alarms,
        total_alarms,
        completeness: summarize_completeness(devices),
    }
}

fn bucket(reading: &Reading<String>) -> String {
    reading
        .known()
        .cloned()
        .unwrap_or_else(|| UNKNOWN_BUCKET.to_owned())
}

/// The backend stamps every record with the customer it belongs to.
fn first_customer(devices: &[Arc<Device>]) -> Option<String> {
    devices
        .iter()
        .find_map(|d| d.customer_name.known().cloned())
}

fn summarize_completeness(devices: &[Arc<Device>]) -> CompletenessSummary {
    if devices.is_empty() {
        return CompletenessSummary::default();
    }

    let mut ratio_sum = 0.0;
    let mut best: Option<MostComplete> = None;

    for device in devices {
        let c = device.completeness();
        ratio_sum += c.unknown_ratio;

        let better = best.as_ref().is_none_or(|b| c.known > b.known);
        if better {
            if let Some(key) = device.key() {
                best = Some(MostComplete {
                    key: key.to_owned(),
                    known: c.known,
                    total: c.total,
                });
            }
        }
    }

    CompletenessSummary {
        mean_unknown_ratio: ratio_sum / count_as_f64(devices.len()),
        most_complete: best,
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn count_as_f64(n: usize) -> f64 {
    n as f64
}
