use thiserror::Error;

/// Top-level error type for the `probelink-api` crate.
///
/// Covers every failure mode across both API surfaces: the token
/// endpoint and the device telemetry endpoints. `probelink-core`
/// maps these into its own domain variants and retry policy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login or token refresh rejected (wrong credentials, revoked
    /// refresh token). Not retryable without new user input.
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// A data call was rejected with 401 — the access token has
    /// expired or been invalidated. A refresh may resolve it.
    #[error("Access token expired or rejected")]
    TokenExpired,

    // ── Rate limiting ────────────────────────────────────────────────
    /// 429 from the vendor. The client never retries internally;
    /// callers decide how to honour `retry_after_secs`.
    #[error("Rate limited by vendor API")]
    RateLimited { retry_after_secs: Option<u64> },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Requested resource does not exist (e.g. a deregistered device).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Any other non-2xx response from the vendor.
    #[error("Vendor API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

impl Error {
    /// Returns `true` if this error indicates the access token has
    /// expired and a refresh might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::TokenExpired)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::NotFound { .. } => true,
            _ => false,
        }
    }

    /// Server-requested retry delay, when the vendor provided one.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Self::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(std::time::Duration::from_secs(*secs)),
            _ => None,
        }
    }
}
