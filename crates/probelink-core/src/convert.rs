// Wire → domain conversions.
//
// Kept out of the model modules so the domain types never depend on
// the vendor's JSON shapes.

use probelink_api::types::{DeviceStatus, ProbeReading};

use crate::model::{Device, Probe};

impl From<DeviceStatus> for Device {
    fn from(status: DeviceStatus) -> Self {
        Self {
            device_id: status.device_id,
            name: status.label,
            device_type: status.device_type,
            probes: status.probes.into_iter().map(Probe::from).collect(),
        }
    }
}

impl From<ProbeReading> for Probe {
    fn from(reading: ProbeReading) -> Self {
        Self {
            probe_id: reading.probe_id,
            label: reading.label,
            temperature: reading.temperature,
            battery_percent: reading.battery_percent,
            signal_strength: reading.signal_strength,
            last_seen: reading.last_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_readings_stay_absent() {
        let status = DeviceStatus {
            device_id: "dev-a".into(),
            label: Some("Smoker".into()),
            device_type: None,
            probes: vec![ProbeReading {
                probe_id: "1".into(),
                label: None,
                temperature: Some(0.0),
                battery_percent: None,
                signal_strength: None,
                last_seen: None,
            }],
        };

        let device = Device::from(status);
        let probe = &device.probes[0];
        // A zero reading survives; absent readings stay None.
        assert_eq!(probe.temperature, Some(0.0));
        assert!(probe.battery_percent.is_none());
        assert!(probe.signal_strength.is_none());
    }
}
