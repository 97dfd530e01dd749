// Client for the vendor token endpoint.
//
// Two grant flows: password login (initial setup, driven by the host
// platform's config flow) and refresh-token renewal (every expiry).
// The endpoint's wire bytes beyond this JSON shape are the vendor's
// concern; this client only distinguishes "rejected" from "transient".

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;

/// A successful token grant from the vendor.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_in_secs: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    grant_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Async client for the vendor token endpoint.
pub struct AuthClient {
    http: reqwest::Client,
    token_url: Url,
}

impl AuthClient {
    /// Build from the API base URL and transport config.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let base = Url::parse(base_url)?;
        let token_url = base.join("v1/token")?;
        let http = transport.build_client()?;
        Ok(Self { http, token_url })
    }

    /// Wrap an existing `reqwest::Client` (tests).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Result<Self, Error> {
        let token_url = base_url.join("v1/token")?;
        Ok(Self { http, token_url })
    }

    /// Exchange user credentials for an initial token pair.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<TokenGrant, Error> {
        debug!(%email, "requesting password grant");
        self.request_grant(&TokenRequest {
            grant_type: "password",
            email: Some(email),
            password: Some(password.expose_secret()),
            refresh_token: None,
        })
        .await
    }

    /// Renew the token pair using a refresh token.
    ///
    /// A 4xx here means the refresh token is revoked or invalid —
    /// callers must treat that as unrecoverable and reauthenticate.
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenGrant, Error> {
        debug!("requesting refresh grant");
        self.request_grant(&TokenRequest {
            grant_type: "refresh_token",
            email: None,
            password: None,
            refresh_token: Some(refresh_token.expose_secret()),
        })
        .await
    }

    async fn request_grant(&self, body: &TokenRequest<'_>) -> Result<TokenGrant, Error> {
        let resp = self
            .http
            .post(self.token_url.clone())
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let raw = resp.text().await?;
            let parsed: TokenResponse = serde_json::from_str(&raw).map_err(|e| {
                Error::Deserialization {
                    message: e.to_string(),
                    body: raw,
                }
            })?;
            return Ok(TokenGrant {
                access_token: parsed.access_token.into(),
                refresh_token: parsed.refresh_token.into(),
                expires_in_secs: parsed.expires_in,
            });
        }

        // 429 is transient even on the token endpoint.
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                retry_after_secs: None,
            });
        }

        let raw = resp.text().await.unwrap_or_default();
        if status.is_client_error() {
            let message = serde_json::from_str::<TokenErrorResponse>(&raw)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or_else(|| status.to_string());
            return Err(Error::InvalidCredentials { message });
        }

        Err(Error::Api {
            status: status.as_u16(),
            message: if raw.is_empty() {
                status.to_string()
            } else {
                raw
            },
        })
    }
}
