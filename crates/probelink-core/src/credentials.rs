// ── Credential store ──
//
// Exclusive owner of the access/refresh token pair. Every other
// component sees only the narrow `get_token` / `refresh` capability —
// never raw field mutation. Refresh is single-flight: concurrent
// callers hitting an expired token trigger exactly one vendor call.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use secrecy::SecretString;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, info};

use probelink_api::{AccessToken, TokenGrant};

use crate::error::CoreError;

/// Refresh this far ahead of the vendor-reported expiry.
const SAFETY_MARGIN_SECS: i64 = 60;

/// The stored token pair. `expires_at` is always consistent with the
/// held `access_token` — both are replaced atomically on refresh.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl Credentials {
    /// Build from a fresh token grant.
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Self {
        let lifetime = i64::try_from(grant.expires_in_secs)
            .ok()
            .and_then(ChronoDuration::try_seconds)
            .unwrap_or(ChronoDuration::MAX);
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at: now
                .checked_add_signed(lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .checked_sub_signed(ChronoDuration::seconds(SAFETY_MARGIN_SECS))
            .is_some_and(|deadline| now < deadline)
    }
}

/// The vendor capability needed to renew a token pair.
///
/// Implemented by [`probelink_api::AuthClient`]; test code substitutes
/// counting fakes.
pub trait TokenAuthority: Send + Sync + 'static {
    fn refresh_grant(
        &self,
        refresh_token: &SecretString,
    ) -> impl Future<Output = Result<TokenGrant, probelink_api::Error>> + Send;
}

impl TokenAuthority for probelink_api::AuthClient {
    fn refresh_grant(
        &self,
        refresh_token: &SecretString,
    ) -> impl Future<Output = Result<TokenGrant, probelink_api::Error>> + Send {
        self.refresh(refresh_token)
    }
}

/// Receives replacement credentials for durable storage.
///
/// The host platform owns the actual storage; the store calls this on
/// every change.
pub trait CredentialSink: Send + Sync + 'static {
    fn persist(&self, credentials: &Credentials);
}

/// Owns the authoritative in-memory token pair.
pub struct CredentialStore<A: TokenAuthority> {
    authority: A,
    state: RwLock<Credentials>,
    /// Serializes refresh attempts — the single-flight gate.
    refresh_gate: Mutex<()>,
    sink: Option<Arc<dyn CredentialSink>>,
    /// Generation counter, bumped on every credential replacement.
    /// A coordinator parked in `NeedsReauth` watches this.
    generation: watch::Sender<u64>,
}

impl<A: TokenAuthority> CredentialStore<A> {
    pub fn new(authority: A, initial: Credentials) -> Self {
        let (generation, _) = watch::channel(0u64);
        Self {
            authority,
            state: RwLock::new(initial),
            refresh_gate: Mutex::new(()),
            sink: None,
            generation,
        }
    }

    /// Attach a persistence sink, called on every credential change.
    pub fn with_sink(mut self, sink: Arc<dyn CredentialSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Return a currently valid access token, refreshing first when
    /// the stored one is within the safety margin of expiry.
    ///
    /// Fails with [`CoreError::NeedsReauth`] when the refresh token is
    /// revoked — the caller must suspend polling until new credentials
    /// arrive via [`replace`](Self::replace).
    pub async fn get_token(&self) -> Result<AccessToken, CoreError> {
        if let Some(token) = self.current_if_fresh().await {
            return Ok(token);
        }
        self.refresh().await
    }

    /// Force a refresh against the vendor token endpoint.
    ///
    /// Single-flight: a caller that lost the race returns the token
    /// installed by the winner instead of refreshing again.
    pub async fn refresh(&self) -> Result<AccessToken, CoreError> {
        let _gate = self.refresh_gate.lock().await;

        // Re-check under the gate: another caller may have refreshed
        // while we waited.
        if let Some(token) = self.current_if_fresh().await {
            return Ok(token);
        }

        let refresh_token = self.state.read().await.refresh_token.clone();
        debug!("refreshing access token");
        let grant = self.authority.refresh_grant(&refresh_token).await?;

        let credentials = Credentials::from_grant(grant, Utc::now());
        let token = AccessToken::new(credentials.access_token.clone());
        self.install(credentials).await;
        info!("access token refreshed");
        Ok(token)
    }

    /// Drop the current access token so the next `get_token()` must
    /// refresh. Used when a data call reports the token rejected
    /// before its nominal expiry.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.expires_at = DateTime::<Utc>::MIN_UTC;
        debug!("access token invalidated");
    }

    /// Install externally supplied credentials (host-driven
    /// reauthentication). Wakes any coordinator parked in
    /// `NeedsReauth`.
    pub async fn replace(&self, credentials: Credentials) {
        self.install(credentials).await;
        info!("credentials replaced externally");
    }

    /// Observe credential replacements (generation counter).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    async fn current_if_fresh(&self) -> Option<AccessToken> {
        let state = self.state.read().await;
        state
            .is_fresh(Utc::now())
            .then(|| AccessToken::new(state.access_token.clone()))
    }

    async fn install(&self, credentials: Credentials) {
        {
            let mut state = self.state.write().await;
            *state = credentials.clone();
        }
        if let Some(ref sink) = self.sink {
            sink.persist(&credentials);
        }
        self.generation.send_modify(|g| *g += 1);
    }
}
