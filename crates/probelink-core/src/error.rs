// ── Core error types ──
//
// User-facing errors from probelink-core. These are NOT API-specific --
// the host platform never sees HTTP status codes or JSON parse failures
// directly. The `From<probelink_api::Error>` impl translates
// transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Authentication ───────────────────────────────────────────────
    /// Credentials are revoked or invalid. Polling is suspended until
    /// the user reauthenticates through the host platform.
    #[error("Reauthentication required: {message}")]
    NeedsReauth { message: String },

    /// Token refresh failed for a transient reason (network, 5xx).
    #[error("Authentication temporarily unavailable: {message}")]
    AuthUnavailable { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    #[error("Rate limited by vendor API")]
    RateLimited { retry_after: Option<std::time::Duration> },

    #[error("Vendor API unreachable: {message}")]
    Network { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The coordinator has been stopped.
    #[error("Coordinator stopped")]
    Stopped,
}

impl CoreError {
    /// Returns `true` if retrying with backoff may resolve this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::NeedsReauth { .. } | Self::Config { .. } | Self::Stopped
        )
    }

    /// Server-requested retry delay, when the vendor provided one.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<probelink_api::Error> for CoreError {
    fn from(err: probelink_api::Error) -> Self {
        match err {
            probelink_api::Error::InvalidCredentials { message } => {
                CoreError::NeedsReauth { message }
            }
            probelink_api::Error::TokenExpired => CoreError::AuthUnavailable {
                message: "access token rejected -- refresh required".into(),
            },
            probelink_api::Error::RateLimited { retry_after_secs } => CoreError::RateLimited {
                retry_after: retry_after_secs.map(std::time::Duration::from_secs),
            },
            probelink_api::Error::NotFound { resource } => CoreError::DeviceNotFound {
                device_id: resource,
            },
            probelink_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            probelink_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else {
                    CoreError::Network {
                        message: e.to_string(),
                    }
                }
            }
            probelink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            probelink_api::Error::Tls(msg) => CoreError::Network {
                message: format!("TLS error: {msg}"),
            },
            probelink_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("Deserialization error: {message}"),
                status: None,
            },
            probelink_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
        }
    }
}
