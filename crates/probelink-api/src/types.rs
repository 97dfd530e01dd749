// Wire types for the vendor cloud API (camelCase JSON).
//
// Optional probe readings stay `Option<f64>` end to end: the vendor
// omits a field when a probe has no reading, and "no data" must remain
// distinguishable from a zero reading.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One entry from `GET v1/devices` — device shape only, no readings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub device_id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
}

/// Full device status from `GET v1/devices/{id}`, including current
/// probe readings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub device_id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub probes: Vec<ProbeReading>,
}

/// A single probe's current readings. All measurement fields are
/// absent (not zero) when the vendor has no data for them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReading {
    pub probe_id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub battery_percent: Option<f64>,
    #[serde(default)]
    pub signal_strength: Option<f64>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Paged envelope for list endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total_count: i64,
}
