// Hand-crafted async HTTP client for the vendor device telemetry API.
//
// Base path: /v1/
// Auth: Bearer token per call — the caller owns the token lifecycle.
// No client-side caching, no internal retries: rate limits and token
// expiry are reported as typed errors and left to the coordinator.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;
use crate::types::{DeviceStatus, DeviceSummary, Page};

/// A currently valid access token, passed per call.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(token: SecretString) -> Self {
        Self(token)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.0.expose_secret())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

// ── Error response shape from the vendor API ─────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the vendor device endpoints.
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl CloudClient {
    /// Build from the API base URL and transport config.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            timeout_secs: transport.timeout.as_secs(),
        })
    }

    /// Wrap an existing `reqwest::Client` (tests).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout_secs: 30,
        }
    }

    /// Ensure the base URL ends with a slash so relative joins work.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// Join a relative path (e.g. `"v1/devices"`) onto the base URL.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP plumbing ────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        path: &str,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let mut bearer = reqwest::header::HeaderValue::try_from(token.bearer()).map_err(|_| {
            Error::InvalidCredentials {
                message: "access token is not a valid header value".into(),
            }
        })?;
        bearer.set_sensitive(true);

        let resp = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, bearer)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::handle_response(resp, path).await
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(e)
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        resp: reqwest::Response,
        resource: &str,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            return serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            });
        }
        Err(Self::parse_error(status, resp, resource).await)
    }

    async fn parse_error(
        status: reqwest::StatusCode,
        resp: reqwest::Response,
        resource: &str,
    ) -> Error {
        match status {
            reqwest::StatusCode::UNAUTHORIZED => Error::TokenExpired,
            reqwest::StatusCode::NOT_FOUND => Error::NotFound {
                resource: resource.to_owned(),
            },
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                Error::RateLimited { retry_after_secs }
            }
            _ => {
                let raw = resp.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorResponse>(&raw)
                    .ok()
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| {
                        if raw.is_empty() {
                            status.to_string()
                        } else {
                            raw
                        }
                    });
                Error::Api {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// List all devices registered to the account (shape only, no
    /// probe readings). Follows pagination to exhaustion.
    pub async fn list_devices(&self, token: &AccessToken) -> Result<Vec<DeviceSummary>, Error> {
        let mut all = Vec::new();
        let mut offset: i64 = 0;
        let limit = 100;

        loop {
            let page: Page<DeviceSummary> = self
                .get(
                    token,
                    &format!("v1/devices?offset={offset}&limit={limit}"),
                )
                .await?;
            let received = page.data.len();
            all.extend(page.data);

            if received < limit
                || i64::try_from(all.len()).unwrap_or(i64::MAX) >= page.total_count
            {
                break;
            }
            offset += i64::try_from(received).unwrap_or(i64::MAX);
        }

        Ok(all)
    }

    /// Fetch one device's current status, including probe readings.
    ///
    /// Returns [`Error::NotFound`] if the device was deregistered
    /// since the last list.
    pub async fn get_device_status(
        &self,
        token: &AccessToken,
        device_id: &str,
    ) -> Result<DeviceStatus, Error> {
        self.get(token, &format!("v1/devices/{device_id}")).await
    }
}
