// ── Runtime bridge configuration ──
//
// These types describe *how* to reach the vendor cloud and how often to
// poll it. They carry credential data and scheduling tuning, but never
// touch disk. The host platform constructs a `BridgeConfig` from its
// config entry and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::backoff::BackoffConfig;

/// Default polling interval (matches the vendor's recommended cadence).
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(1800);

/// Floor for user-supplied scan intervals. Values below this are
/// clamped to avoid hammering the vendor API.
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default — the vendor cloud presents
    /// a publicly trusted certificate.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (test servers only).
    DangerAcceptInvalid,
}

/// Configuration for one bridge instance.
///
/// Built by the host platform at setup; the core never reads config
/// files.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Vendor API base URL (e.g. `https://cloud.example.com/`).
    pub base_url: Url,
    /// Account email, entered through the host's config flow.
    pub email: String,
    /// Account password.
    pub password: SecretString,
    /// How often to poll. Clamped to [`MIN_SCAN_INTERVAL`] by
    /// [`validated()`](Self::validated).
    pub scan_interval: Duration,
    /// Bound on concurrent per-device status fetches within a cycle.
    pub fetch_concurrency: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Backoff tuning for failed cycles.
    pub backoff: BackoffConfig,
    /// Age after which a probe's last-known reading is flagged stale.
    /// `None` derives 2× the scan interval, tracking later changes to
    /// `scan_interval`.
    pub stale_after: Option<Duration>,
}

impl BridgeConfig {
    /// Build a config with defaults for everything but the account.
    pub fn new(base_url: Url, email: String, password: SecretString) -> Self {
        Self {
            base_url,
            email,
            password,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            fetch_concurrency: 4,
            request_timeout: Duration::from_secs(30),
            tls: TlsVerification::default(),
            backoff: BackoffConfig::default(),
            stale_after: None,
        }
    }

    /// The effective staleness threshold: `stale_after` when set,
    /// otherwise 2× the scan interval.
    pub fn staleness_threshold(&self) -> Duration {
        self.stale_after.unwrap_or(self.scan_interval * 2)
    }

    /// Apply invariants: clamp a too-small scan interval to the floor
    /// and keep `fetch_concurrency` at least 1.
    pub fn validated(mut self) -> Self {
        if self.scan_interval < MIN_SCAN_INTERVAL {
            tracing::warn!(
                requested_secs = self.scan_interval.as_secs(),
                floor_secs = MIN_SCAN_INTERVAL.as_secs(),
                "scan interval below floor -- clamping"
            );
            self.scan_interval = MIN_SCAN_INTERVAL;
        }
        if self.fetch_concurrency == 0 {
            self.fetch_concurrency = 1;
        }
        self
    }
}
