// One polling cycle's results across all known devices.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::Device;

/// Immutable result of a single poll cycle.
///
/// A new `Snapshot` is built every cycle and published whole; prior
/// snapshots are never mutated. `partial_failures` names the devices
/// whose detail fetch failed this cycle while the rest succeeded —
/// their entries in `devices` are carried over from the previous
/// snapshot when available.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub devices: BTreeMap<String, Arc<Device>>,
    pub partial_failures: BTreeSet<String>,
}

impl Snapshot {
    /// Look up a device by id.
    pub fn device(&self, device_id: &str) -> Option<&Arc<Device>> {
        self.devices.get(device_id)
    }

    /// Whether the given device failed to update this cycle.
    pub fn is_partial_failure(&self, device_id: &str) -> bool {
        self.partial_failures.contains(device_id)
    }

    /// Total number of probes across all devices.
    pub fn probe_count(&self) -> usize {
        self.devices.values().map(|d| d.probes.len()).sum()
    }
}
