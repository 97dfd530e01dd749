//! Polling bridge between a cloud probe-telemetry vendor and a host
//! home-automation platform.
//!
//! This crate owns the data-synchronization core:
//!
//! - **[`Coordinator`]** — the polling state machine. Wakes on a
//!   configurable interval (or a manual refresh request), obtains a
//!   valid token from the [`CredentialStore`], lists devices, fans out
//!   per-device status fetches with bounded concurrency, and publishes
//!   an immutable [`Snapshot`] through a `watch` channel. Failures are
//!   classified into exponential backoff, rate-limit-aware scheduling,
//!   or a terminal reauthentication state.
//!
//! - **[`CredentialStore`]** — exclusive owner of the access/refresh
//!   token pair. `get_token()` refreshes ahead of expiry with
//!   single-flight semantics and pushes replacement credentials to an
//!   injected persistence sink.
//!
//! - **Domain model** ([`model`]) — [`Device`], [`Probe`], and the
//!   per-cycle [`Snapshot`] with its `partial_failures` set. Optional
//!   probe readings stay optional: "no data" is never zero.
//!
//! - **Adapter surface** ([`sensors`]) — flattens snapshots into
//!   sensor readings keyed by stable `(device_id, probe_id)` identity
//!   for the host platform's entity registry.

pub mod backoff;
pub mod bridge;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod model;
pub mod sensors;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backoff::{Backoff, BackoffConfig};
pub use bridge::{CloudCoordinator, connect, resume};
pub use config::{BridgeConfig, TlsVerification};
pub use coordinator::{Coordinator, CyclePhase, ProbeApi};
pub use credentials::{CredentialSink, CredentialStore, Credentials, TokenAuthority};
pub use error::CoreError;
pub use model::{Device, Probe, Snapshot};
pub use sensors::{SensorKind, SensorReading, sensor_readings};
