// Domain types for vendor devices and their probes.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;

/// A telemetry device (gateway, thermometer hub, …).
///
/// Identity is `device_id`; the rest of the shape can change when the
/// vendor re-lists the account's devices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub device_id: String,
    pub name: Option<String>,
    pub device_type: Option<String>,
    /// Probes in vendor-reported order.
    pub probes: Vec<Probe>,
}

impl Device {
    /// Human-readable name for logs:
    /// `{user label} ({type} - {device_id})`.
    pub fn display_name(&self) -> String {
        format!(
            "{} ({} - {})",
            self.name.as_deref().unwrap_or("unnamed device"),
            self.device_type.as_deref().unwrap_or("unknown type"),
            self.device_id
        )
    }
}

/// One probe's readings from a single poll cycle.
///
/// Measurement fields are `None` when the vendor reported no data --
/// callers must never conflate "no data" with a zero reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Probe {
    pub probe_id: String,
    pub label: Option<String>,
    pub temperature: Option<f64>,
    pub battery_percent: Option<f64>,
    pub signal_strength: Option<f64>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Probe {
    /// Whether this probe's last reading is older than `threshold`.
    ///
    /// A probe with no `last_seen` at all is treated as stale — the
    /// vendor has never reported for it.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: std::time::Duration) -> bool {
        match self.last_seen {
            Some(seen) => {
                let age = now - seen;
                age > ChronoDuration::from_std(threshold).unwrap_or(ChronoDuration::MAX)
            }
            None => true,
        }
    }
}
