// Canonical domain model for the bridge.

pub mod device;
pub mod snapshot;

pub use device::{Device, Probe};
pub use snapshot::Snapshot;
