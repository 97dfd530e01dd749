// ── Sensor adapter surface ──
//
// Flattens a snapshot into per-probe sensor readings keyed by a stable
// `(device_id, probe_id)` composite id, the shape host platforms want
// for entity registration. Absent measurements produce no reading at
// all — "no data" never turns into a zero.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::model::Snapshot;

/// What a reading measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Probe temperature, degrees Celsius.
    Temperature,
    /// Probe battery level, percent.
    BatteryLevel,
    /// Probe radio signal strength.
    SignalStrength,
}

impl SensorKind {
    /// Suffix used in composite sensor ids.
    fn id_suffix(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::BatteryLevel => "battery",
            SensorKind::SignalStrength => "signal",
        }
    }
}

/// One host-platform sensor value derived from a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    /// Stable composite id: `{device_id}:{probe_id}:{kind}`.
    pub sensor_id: String,
    pub device_id: String,
    pub probe_id: String,
    /// Device label + probe label, for display.
    pub name: String,
    pub kind: SensorKind,
    pub value: f64,
    pub last_seen: Option<DateTime<Utc>>,
    /// Older than the configured staleness threshold, or the owning
    /// device failed to update this cycle. The value shown is the last
    /// known one.
    pub stale: bool,
}

/// Flatten a snapshot into sensor readings.
///
/// Ordering is deterministic: devices in id order, probes in
/// vendor-reported order, kinds in declaration order. Probes whose
/// measurement is absent contribute no reading for that kind.
pub fn sensor_readings(
    snapshot: &Snapshot,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Vec<SensorReading> {
    let mut readings = Vec::with_capacity(snapshot.probe_count());

    for device in snapshot.devices.values() {
        let device_failed = snapshot.is_partial_failure(&device.device_id);
        for probe in &device.probes {
            let stale = device_failed || probe.is_stale(now, stale_after);
            let name = format!(
                "{} {}",
                device.name.as_deref().unwrap_or(&device.device_id),
                probe.label.as_deref().unwrap_or(&probe.probe_id),
            );
            let measurements = [
                (SensorKind::Temperature, probe.temperature),
                (SensorKind::BatteryLevel, probe.battery_percent),
                (SensorKind::SignalStrength, probe.signal_strength),
            ];
            for (kind, value) in measurements {
                let Some(value) = value else { continue };
                readings.push(SensorReading {
                    sensor_id: format!(
                        "{}:{}:{}",
                        device.device_id,
                        probe.probe_id,
                        kind.id_suffix()
                    ),
                    device_id: device.device_id.clone(),
                    probe_id: probe.probe_id.clone(),
                    name: name.clone(),
                    kind,
                    value,
                    last_seen: probe.last_seen,
                    stale,
                });
            }
        }
    }

    readings
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::model::{Device, Probe};

    fn snapshot_with(devices: Vec<Device>, partial_failures: &[&str]) -> Snapshot {
        Snapshot {
            captured_at: Utc::now(),
            devices: devices
                .into_iter()
                .map(|d| (d.device_id.clone(), Arc::new(d)))
                .collect::<BTreeMap<_, _>>(),
            partial_failures: partial_failures
                .iter()
                .map(|id| (*id).to_string())
                .collect::<BTreeSet<_>>(),
        }
    }

    fn device(device_id: &str, probes: Vec<Probe>) -> Device {
        Device {
            device_id: device_id.into(),
            name: Some("Smoker".into()),
            device_type: None,
            probes,
        }
    }

    #[test]
    fn absent_measurements_produce_no_reading() {
        let now = Utc::now();
        let snap = snapshot_with(
            vec![device(
                "dev-a",
                vec![Probe {
                    probe_id: "1".into(),
                    label: Some("Brisket".into()),
                    temperature: Some(72.5),
                    battery_percent: None,
                    signal_strength: None,
                    last_seen: Some(now),
                }],
            )],
            &[],
        );

        let readings = sensor_readings(&snap, now, Duration::from_secs(3600));
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].kind, SensorKind::Temperature);
        assert_eq!(readings[0].value, 72.5);
        assert_eq!(readings[0].sensor_id, "dev-a:1:temperature");
        assert!(!readings[0].stale);
    }

    #[test]
    fn zero_reading_is_a_reading() {
        let now = Utc::now();
        let snap = snapshot_with(
            vec![device(
                "dev-a",
                vec![Probe {
                    probe_id: "1".into(),
                    label: None,
                    temperature: Some(0.0),
                    battery_percent: None,
                    signal_strength: None,
                    last_seen: Some(now),
                }],
            )],
            &[],
        );

        let readings = sensor_readings(&snap, now, Duration::from_secs(3600));
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 0.0);
    }

    #[test]
    fn failed_device_readings_are_marked_stale() {
        let now = Utc::now();
        let snap = snapshot_with(
            vec![device(
                "dev-b",
                vec![Probe {
                    probe_id: "1".into(),
                    label: None,
                    temperature: Some(40.0),
                    battery_percent: Some(90.0),
                    signal_strength: None,
                    last_seen: Some(now),
                }],
            )],
            &["dev-b"],
        );

        let readings = sensor_readings(&snap, now, Duration::from_secs(3600));
        assert_eq!(readings.len(), 2);
        assert!(readings.iter().all(|r| r.stale));
        // Last-known values are still surfaced.
        assert_eq!(readings[0].value, 40.0);
    }

    #[test]
    fn old_last_seen_is_stale() {
        let now = Utc::now();
        let snap = snapshot_with(
            vec![device(
                "dev-a",
                vec![Probe {
                    probe_id: "1".into(),
                    label: None,
                    temperature: Some(21.0),
                    battery_percent: None,
                    signal_strength: None,
                    last_seen: Some(now - ChronoDuration::hours(3)),
                }],
            )],
            &[],
        );

        let readings = sensor_readings(&snap, now, Duration::from_secs(3600));
        assert!(readings[0].stale);
    }

    #[test]
    fn readings_are_ordered_by_device_then_probe() {
        let now = Utc::now();
        let probe = |id: &str| Probe {
            probe_id: id.into(),
            label: None,
            temperature: Some(20.0),
            battery_percent: None,
            signal_strength: None,
            last_seen: Some(now),
        };
        let snap = snapshot_with(
            vec![
                device("dev-b", vec![probe("1")]),
                device("dev-a", vec![probe("1"), probe("2")]),
            ],
            &[],
        );

        let ids: Vec<String> = sensor_readings(&snap, now, Duration::from_secs(3600))
            .into_iter()
            .map(|r| r.sensor_id)
            .collect();
        assert_eq!(
            ids,
            vec![
                "dev-a:1:temperature",
                "dev-a:2:temperature",
                "dev-b:1:temperature",
            ]
        );
    }
}
