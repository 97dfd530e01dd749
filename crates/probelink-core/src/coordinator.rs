// ── Sync coordinator ──
//
// The polling state machine. One logical poll task per bridge
// instance: wake on interval (or manual refresh), obtain a valid
// token, list devices, fan out per-device status fetches, publish a
// snapshot, sleep. Failures are classified into exponential backoff
// or a terminal reauthentication state; a single flaky device never
// blanks out readings for the others.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use futures_util::StreamExt;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use probelink_api::types::{DeviceStatus, DeviceSummary};
use probelink_api::{AccessToken, CloudClient};

use crate::backoff::Backoff;
use crate::config::BridgeConfig;
use crate::credentials::{CredentialStore, TokenAuthority};
use crate::error::CoreError;
use crate::model::{Device, Snapshot};

// ── CyclePhase ────────────────────────────────────────────────────

/// Where the poll task currently is, observable by consumers.
///
/// `NeedsReauth` is terminal until new credentials are supplied
/// through the credential store or a manual refresh arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Authenticating,
    Listing,
    FetchingDetails,
    Publishing,
    Backoff,
    NeedsReauth,
}

// ── Vendor API capability ─────────────────────────────────────────

/// The two vendor calls the coordinator needs.
///
/// Implemented by [`CloudClient`]; tests substitute scripted fakes.
pub trait ProbeApi: Send + Sync + 'static {
    fn list_devices(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<DeviceSummary>, probelink_api::Error>> + Send;

    fn get_device_status(
        &self,
        token: &AccessToken,
        device_id: &str,
    ) -> impl Future<Output = Result<DeviceStatus, probelink_api::Error>> + Send;
}

impl ProbeApi for CloudClient {
    fn list_devices(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<DeviceSummary>, probelink_api::Error>> + Send {
        self.list_devices(token)
    }

    fn get_device_status(
        &self,
        token: &AccessToken,
        device_id: &str,
    ) -> impl Future<Output = Result<DeviceStatus, probelink_api::Error>> + Send {
        self.get_device_status(token, device_id)
    }
}

impl<P: ProbeApi> ProbeApi for Arc<P> {
    fn list_devices(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<DeviceSummary>, probelink_api::Error>> + Send {
        (**self).list_devices(token)
    }

    fn get_device_status(
        &self,
        token: &AccessToken,
        device_id: &str,
    ) -> impl Future<Output = Result<DeviceStatus, probelink_api::Error>> + Send {
        (**self).get_device_status(token, device_id)
    }
}

// ── Coordinator ───────────────────────────────────────────────────

/// The main entry point for adapters.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. [`start()`](Self::start)
/// spawns the poll task (first cycle runs immediately);
/// [`stop()`](Self::stop) cancels and joins it.
pub struct Coordinator<A: ProbeApi, T: TokenAuthority> {
    inner: Arc<CoordinatorInner<A, T>>,
}

impl<A: ProbeApi, T: TokenAuthority> Clone for Coordinator<A, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<A: ProbeApi, T: TokenAuthority> {
    api: A,
    credentials: CredentialStore<T>,
    config: BridgeConfig,
    snapshot: watch::Sender<Arc<Snapshot>>,
    phase: watch::Sender<CyclePhase>,
    /// Manual refresh requests. `Notify` stores at most one permit, so
    /// any number of requests during an in-flight cycle coalesce into
    /// exactly one follow-up cycle.
    refresh_requested: Notify,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// How a failed cycle should be handled by the scheduler.
enum CycleFailure {
    /// Credentials revoked — park until reauthentication.
    NeedsReauth,
    /// Transient — back off, honouring a server retry hint when given.
    Retry { retry_after: Option<Duration> },
}

impl<A: ProbeApi, T: TokenAuthority> Coordinator<A, T> {
    /// Create a coordinator. Does NOT poll — call
    /// [`start()`](Self::start) to spawn the poll task.
    pub fn new(config: BridgeConfig, api: A, credentials: CredentialStore<T>) -> Self {
        let config = config.validated();
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::default()));
        let (phase, _) = watch::channel(CyclePhase::Idle);

        Self {
            inner: Arc::new(CoordinatorInner {
                api,
                credentials,
                config,
                snapshot,
                phase,
                refresh_requested: Notify::new(),
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    /// Access the bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Access the credential store (host reauthentication path).
    pub fn credentials(&self) -> &CredentialStore<T> {
        &self.inner.credentials
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the poll task. The first cycle runs immediately; later
    /// cycles follow the configured scan interval.
    pub async fn start(&self) {
        let mut task = self.inner.task.lock().await;
        if task.is_some() {
            debug!("poll task already running");
            return;
        }
        let coordinator = self.clone();
        *task = Some(tokio::spawn(poll_task(coordinator)));
        info!(
            scan_interval_secs = self.inner.config.scan_interval.as_secs(),
            "poll task started"
        );
    }

    /// Cancel the poll task and wait for it to finish. The last
    /// published snapshot stays observable.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.task.lock().await.take() {
            let _ = handle.await;
        }
        debug!("poll task stopped");
    }

    // ── Adapter surface ──────────────────────────────────────────

    /// Subscribe to snapshot publications. Snapshots arrive in
    /// strictly increasing `captured_at` order; the initial value is
    /// an empty snapshot until the first cycle completes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_sender().subscribe()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot_sender().borrow().clone()
    }

    /// Observe the poll task's current phase.
    pub fn phase(&self) -> watch::Receiver<CyclePhase> {
        self.inner.phase.subscribe()
    }

    /// Request an immediate poll cycle.
    ///
    /// Cancels a pending sleep; never interrupts an in-flight cycle —
    /// requests issued while one is running coalesce into a single
    /// follow-up cycle after it completes.
    pub fn request_refresh(&self) {
        self.inner.refresh_requested.notify_one();
    }

    fn snapshot_sender(&self) -> &watch::Sender<Arc<Snapshot>> {
        &self.inner.snapshot
    }
}

// ── Poll task ─────────────────────────────────────────────────────

/// The single polling loop. Cycles never overlap themselves: the
/// interval is a floor, so an overlong cycle starts the next one
/// immediately after completion.
async fn poll_task<A: ProbeApi, T: TokenAuthority>(coordinator: Coordinator<A, T>) {
    let inner = &coordinator.inner;
    let cancel = inner.cancel.clone();
    let mut backoff = Backoff::new(inner.config.backoff.clone());
    let mut credential_updates = inner.credentials.subscribe();

    loop {
        let cycle_start = Instant::now();
        // Generation at cycle start. A cycle's own successful refresh
        // bumps the counter; only credentials installed after the
        // failure below may wake a NeedsReauth park.
        let generation = *credential_updates.borrow_and_update();

        let wake_at = match run_cycle(inner).await {
            Ok(rate_limit_hint) => {
                backoff.reset();
                // A per-device 429 stretches the next cycle out to the
                // server's retry hint when it exceeds the interval.
                let delay = rate_limit_hint.map_or(inner.config.scan_interval, |hint| {
                    hint.max(inner.config.scan_interval)
                });
                // Floor semantics: schedule from cycle start, so a
                // cycle longer than the interval rolls straight into
                // the next one.
                cycle_start + delay
            }
            Err(CycleFailure::NeedsReauth) => {
                let _ = inner.phase.send_replace(CyclePhase::NeedsReauth);
                warn!("credentials revoked -- polling suspended until reauthentication");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = credential_updates.wait_for(|g| *g != generation) => {
                        info!("new credentials supplied -- resuming polling");
                    }
                    () = inner.refresh_requested.notified() => {
                        debug!("manual refresh while reauth pending");
                    }
                }
                continue;
            }
            Err(CycleFailure::Retry { retry_after }) => {
                let delay = backoff.next_delay(retry_after);
                let _ = inner.phase.send_replace(CyclePhase::Backoff);
                warn!(
                    delay_secs = delay.as_secs(),
                    consecutive_failures = backoff.consecutive_failures(),
                    "cycle failed -- backing off"
                );
                Instant::now() + delay
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = inner.refresh_requested.notified() => {
                debug!("manual refresh requested -- starting cycle now");
            }
            () = tokio::time::sleep_until(wake_at) => {}
        }
    }

    debug!("poll task exiting");
}

/// One full poll cycle: Authenticating → Listing → FetchingDetails →
/// Publishing. Returns the largest per-device rate-limit hint seen,
/// if any.
async fn run_cycle<A: ProbeApi, T: TokenAuthority>(
    inner: &CoordinatorInner<A, T>,
) -> Result<Option<Duration>, CycleFailure> {
    let _ = inner.phase.send_replace(CyclePhase::Authenticating);
    let token = match inner.credentials.get_token().await {
        Ok(token) => token,
        Err(CoreError::NeedsReauth { message }) => {
            warn!(%message, "token refresh unrecoverable");
            return Err(CycleFailure::NeedsReauth);
        }
        Err(e) => {
            warn!(error = %e, "token refresh failed (transient)");
            return Err(CycleFailure::Retry {
                retry_after: e.retry_after(),
            });
        }
    };

    // Listing establishes the authoritative device-id set for this
    // cycle. On failure the previous snapshot stays published — prior
    // data is never discarded on a failed list.
    let _ = inner.phase.send_replace(CyclePhase::Listing);
    let summaries = match inner.api.list_devices(&token).await {
        Ok(summaries) => summaries,
        Err(e) => {
            if e.is_auth_expired() {
                inner.credentials.invalidate().await;
            }
            warn!(error = %e, "device list failed -- previous snapshot retained");
            return Err(CycleFailure::Retry {
                retry_after: e.retry_after(),
            });
        }
    };

    // Fan-out/fan-in: bounded concurrent status fetches, and the
    // cycle joins every outcome before publishing.
    let _ = inner.phase.send_replace(CyclePhase::FetchingDetails);
    let previous: Arc<Snapshot> = inner.snapshot.borrow().clone();
    let token_ref = &token;
    let results: Vec<(String, Result<DeviceStatus, probelink_api::Error>)> =
        futures_util::stream::iter(summaries.into_iter().map(|summary| {
            let device_id = summary.device_id;
            async move {
                let result = inner.api.get_device_status(token_ref, &device_id).await;
                (device_id, result)
            }
        }))
        .buffer_unordered(inner.config.fetch_concurrency)
        .collect()
        .await;

    let mut devices: BTreeMap<String, Arc<Device>> = BTreeMap::new();
    let mut partial_failures: BTreeSet<String> = BTreeSet::new();
    let mut rate_limit_hint: Option<Duration> = None;
    let mut token_rejected = false;

    for (device_id, result) in results {
        match result {
            Ok(status) => {
                devices.insert(device_id, Arc::new(Device::from(status)));
            }
            Err(e) => {
                // Per-device isolation: record the failure and carry
                // over the device's last known state when we have one.
                warn!(
                    device_id = %device_id,
                    error = %e,
                    "device status fetch failed -- carrying over last known state"
                );
                if let Some(hint) = e.retry_after() {
                    rate_limit_hint = Some(rate_limit_hint.map_or(hint, |cur| cur.max(hint)));
                }
                token_rejected |= e.is_auth_expired();
                if let Some(prev) = previous.devices.get(&device_id) {
                    devices.insert(device_id.clone(), Arc::clone(prev));
                }
                partial_failures.insert(device_id);
            }
        }
    }

    if token_rejected {
        inner.credentials.invalidate().await;
    }

    let _ = inner.phase.send_replace(CyclePhase::Publishing);
    let snapshot = Snapshot {
        captured_at: strictly_after(&previous),
        devices,
        partial_failures,
    };
    debug!(
        devices = snapshot.devices.len(),
        partial_failures = snapshot.partial_failures.len(),
        "publishing snapshot"
    );
    inner.snapshot.send_replace(Arc::new(snapshot));
    let _ = inner.phase.send_replace(CyclePhase::Idle);

    Ok(rate_limit_hint)
}

/// Capture timestamp for a new snapshot, guaranteed strictly greater
/// than the previous one even under clock skew.
fn strictly_after(previous: &Snapshot) -> chrono::DateTime<Utc> {
    let now = Utc::now();
    if now > previous.captured_at {
        now
    } else {
        previous.captured_at + ChronoDuration::milliseconds(1)
    }
}
